//! Server-side cart re-pricing. Client-supplied prices are hints only; the
//! numbers that reach an order or the payment gateway come from here.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{OrderLine, Product};

/// Client-asserted cart line. Only the id and quantity matter for pricing;
/// the note rides along into the order snapshot.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PricedCart {
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

impl PricedCart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Sale price wins when present and non-zero, otherwise the list price.
pub fn effective_unit_price(product: &Product) -> Decimal {
    product
        .sale_price
        .filter(|p| !p.is_zero())
        .unwrap_or(product.price)
}

/// Resolves cart lines against the authoritative catalog records. Lines
/// whose product id has no matching record are dropped, not errors; callers
/// decide what an empty result means. Line order is preserved.
pub fn price_cart(products: &[Product], cart: &[CartLine]) -> PricedCart {
    let mut lines = Vec::with_capacity(cart.len());
    let mut total = Decimal::ZERO;

    for line in cart {
        if line.quantity < 1 {
            continue;
        }
        let Some(product) = products.iter().find(|p| p.id == line.product_id) else {
            continue;
        };
        let unit_price = effective_unit_price(product);
        total += unit_price * Decimal::from(line.quantity);
        lines.push(OrderLine {
            product_id: product.id,
            title: product.title.clone(),
            unit_price,
            quantity: line.quantity,
            note: line.note.clone(),
        });
    }

    PricedCart { lines, total }
}

/// Display/audit triples for the payment gateway, in line order. Never the
/// authority for the charge amount.
pub fn basket_descriptor(lines: &[OrderLine]) -> Vec<(String, String, i32)> {
    lines
        .iter()
        .map(|l| {
            (
                l.title.clone(),
                l.unit_price.normalize().to_string(),
                l.quantity,
            )
        })
        .collect()
}

/// Gateway amounts are integer minor currency units.
pub fn to_minor_units(total: Decimal) -> i64 {
    (total * Decimal::from(100)).round().to_i64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: Uuid, title: &str, price: i64, sale_price: Option<i64>) -> Product {
        Product {
            id,
            title: title.into(),
            slug: title.to_lowercase(),
            description: None,
            price: Decimal::from(price),
            sale_price: sale_price.map(Decimal::from),
            stock_quantity: 10,
            category: None,
            images: vec![],
            material: None,
            dimensions: None,
            is_personalized: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sale_price_wins() {
        let id = Uuid::new_v4();
        let catalog = [product(id, "p1-title", 100, Some(80))];
        let cart = [CartLine {
            product_id: id,
            quantity: 2,
            note: None,
        }];

        let priced = price_cart(&catalog, &cart);
        assert_eq!(priced.total, Decimal::from(160));
        assert_eq!(
            basket_descriptor(&priced.lines),
            vec![("p1-title".to_string(), "80".to_string(), 2)]
        );
    }

    #[test]
    fn test_zero_sale_price_falls_back_to_list_price() {
        let id = Uuid::new_v4();
        let catalog = [product(id, "rug", 250, Some(0))];
        let cart = [CartLine {
            product_id: id,
            quantity: 1,
            note: None,
        }];

        assert_eq!(price_cart(&catalog, &cart).total, Decimal::from(250));
    }

    #[test]
    fn test_unknown_ids_are_dropped_silently() {
        let known = Uuid::new_v4();
        let catalog = [product(known, "vase", 40, None)];
        let cart = [
            CartLine {
                product_id: known,
                quantity: 1,
                note: None,
            },
            CartLine {
                product_id: Uuid::new_v4(),
                quantity: 3,
                note: None,
            },
        ];

        let priced = price_cart(&catalog, &cart);
        assert_eq!(priced.lines.len(), 1);
        assert_eq!(priced.total, Decimal::from(40));
        assert_eq!(basket_descriptor(&priced.lines).len(), 1);
    }

    #[test]
    fn test_all_unknown_yields_empty_cart() {
        let catalog = [product(Uuid::new_v4(), "lamp", 10, None)];
        let cart = [CartLine {
            product_id: Uuid::new_v4(),
            quantity: 2,
            note: None,
        }];

        let priced = price_cart(&catalog, &cart);
        assert!(priced.is_empty());
        assert_eq!(priced.total, Decimal::ZERO);
    }

    #[test]
    fn test_notes_keep_lines_distinct() {
        let id = Uuid::new_v4();
        let catalog = [product(id, "mug", 15, None)];
        let cart = [
            CartLine {
                product_id: id,
                quantity: 1,
                note: Some("For Ayşe".into()),
            },
            CartLine {
                product_id: id,
                quantity: 1,
                note: Some("For Mehmet".into()),
            },
        ];

        let priced = price_cart(&catalog, &cart);
        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.total, Decimal::from(30));
        assert_eq!(priced.lines[0].note.as_deref(), Some("For Ayşe"));
    }

    #[test]
    fn test_fractional_prices_in_descriptor_and_minor_units() {
        let id = Uuid::new_v4();
        let catalog = [product(id, "tray", 0, None)];
        let mut catalog = catalog;
        catalog[0].price = Decimal::new(7990, 2); // 79.90

        let cart = [CartLine {
            product_id: id,
            quantity: 2,
            note: None,
        }];
        let priced = price_cart(&catalog, &cart);
        assert_eq!(priced.total, Decimal::new(15980, 2));
        assert_eq!(to_minor_units(priced.total), 15980);
        assert_eq!(basket_descriptor(&priced.lines)[0].1, "79.9");
    }
}

//! End-to-end checks on the pricing → basket → signing pipeline, without a
//! database or a live gateway.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use maison_commerce::config::PaytrConfig;
use maison_commerce::domain::order::new_merchant_oid;
use maison_commerce::domain::pricing::{
    basket_descriptor, price_cart, to_minor_units, CartLine,
};
use maison_commerce::models::Product;
use maison_commerce::paytr::{encode_basket, sign, TokenRequest};

fn product(id: Uuid, title: &str, price: i64, sale_price: Option<i64>) -> Product {
    Product {
        id,
        title: title.into(),
        slug: title.to_lowercase().replace(' ', "-"),
        description: None,
        price: Decimal::from(price),
        sale_price: sale_price.map(Decimal::from),
        stock_quantity: 25,
        category: Some("living-room".into()),
        images: vec![],
        material: None,
        dimensions: None,
        is_personalized: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn gateway() -> PaytrConfig {
    PaytrConfig {
        merchant_id: "445566".into(),
        merchant_key: "integration-key".into(),
        merchant_salt: "integration-salt".into(),
        test_mode: true,
    }
}

fn token_request(merchant_oid: String, amount: i64, basket: String) -> TokenRequest {
    TokenRequest {
        user_ip: "198.51.100.4".into(),
        merchant_oid,
        email: "buyer@example.com".into(),
        payment_amount: amount,
        user_basket: basket,
        no_installment: 0,
        max_installment: 0,
        currency: "TL".into(),
        user_name: "Deniz Kaya".into(),
        user_address: "Moda Cad. 12, Kadıköy/İstanbul".into(),
        user_phone: "+905550001122".into(),
        ok_url: "https://maison.example/checkout/success".into(),
        fail_url: "https://maison.example/checkout/failure".into(),
    }
}

#[test]
fn sale_price_cart_prices_and_signs() {
    // Catalog: p1 at 100 with sale price 80; cart holds two units.
    let p1 = Uuid::new_v4();
    let catalog = [product(p1, "p1-title", 100, Some(80))];
    let cart = [CartLine {
        product_id: p1,
        quantity: 2,
        note: None,
    }];

    let priced = price_cart(&catalog, &cart);
    assert_eq!(priced.total, Decimal::from(160));

    let basket = basket_descriptor(&priced.lines);
    assert_eq!(basket, vec![("p1-title".to_string(), "80".to_string(), 2)]);

    // The signed amount is minor units of the server-computed total.
    let amount = to_minor_units(priced.total);
    assert_eq!(amount, 16000);

    let encoded = encode_basket(&basket);
    let req = token_request(new_merchant_oid(), amount, encoded.clone());
    let token = sign(&gateway(), &req);
    assert!(!token.is_empty());

    // Same inputs, same token; the signature is deterministic end to end.
    assert_eq!(token, sign(&gateway(), &req));

    // The encoded basket decodes back to the exact triples that were priced.
    let decoded: Vec<(String, String, i32)> =
        serde_json::from_slice(&BASE64.decode(encoded.as_bytes()).unwrap()).unwrap();
    assert_eq!(decoded, basket);
}

#[test]
fn unknown_ids_price_only_the_known_line() {
    let known = Uuid::new_v4();
    let catalog = [product(known, "Linen Cushion", 120, None)];
    let cart = [
        CartLine {
            product_id: known,
            quantity: 1,
            note: None,
        },
        CartLine {
            product_id: Uuid::new_v4(),
            quantity: 4,
            note: None,
        },
    ];

    let priced = price_cart(&catalog, &cart);
    assert_eq!(priced.lines.len(), 1);
    assert_eq!(priced.total, Decimal::from(120));

    let basket = basket_descriptor(&priced.lines);
    assert_eq!(basket.len(), 1);
    assert_eq!(basket[0].0, "Linen Cushion");
}

#[test]
fn repeated_checkouts_produce_distinct_merchant_oids() {
    // Checkout without an idempotency key is deliberately non-idempotent:
    // a retry creates a second order under a fresh gateway reference.
    let first = new_merchant_oid();
    let second = new_merchant_oid();
    assert_ne!(first, second);
    assert!(first.starts_with("ORD-") && second.starts_with("ORD-"));
}

#[test]
fn basket_and_amount_feed_the_signature_independently() {
    let p1 = Uuid::new_v4();
    let catalog = [product(p1, "Oak Tray", 100, Some(80))];
    let cart = [CartLine {
        product_id: p1,
        quantity: 2,
        note: None,
    }];
    let priced = price_cart(&catalog, &cart);
    let basket = encode_basket(&basket_descriptor(&priced.lines));
    let oid = new_merchant_oid();

    let req = token_request(oid.clone(), to_minor_units(priced.total), basket.clone());
    let baseline = sign(&gateway(), &req);

    // A tampered amount with an unchanged basket must change the token.
    let mut tampered = token_request(oid.clone(), 100, basket);
    let changed_amount = sign(&gateway(), &tampered);
    assert_ne!(baseline, changed_amount);

    // A tampered basket with an unchanged amount must change it too.
    tampered = token_request(
        oid,
        to_minor_units(priced.total),
        encode_basket(&[("Oak Tray".into(), "1".into(), 2)]),
    );
    assert_ne!(baseline, sign(&gateway(), &tampered));
}

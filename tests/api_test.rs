//! HTTP-level tests against in-memory stores and the sandbox gateway.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use storefront_checkout::application::webhook_service::signature_header;
use storefront_checkout::config::AppConfig;
use storefront_checkout::{configure, AppState, Ports};

const WEBHOOK_SECRET: &str = "whsec_api_test";

fn config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "STRIPE_WEBHOOK_SECRET" => Some(WEBHOOK_SECRET.to_string()),
        _ => None,
    })
    .expect("default config")
}

fn state() -> AppState {
    let config = config();
    let ports = Ports::in_memory(&config);
    AppState::new(&config, ports)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure),
        )
        .await
    };
}

fn customer() -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "address": "12 rue de la Paix, Paris",
        "country": "FR"
    })
}

/// Catalog product 1 at 25.99. The price sent here is ignored.
fn pilot_wings() -> Value {
    json!({ "id": 1, "name": "Hoodie", "price": 0.01, "quantity": 1 })
}

fn checkout_body(token: &str) -> Value {
    json!({
        "customer": customer(),
        "payment_method": "card",
        "payment": { "token": token }
    })
}

fn signed(payload: &str) -> String {
    signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload.as_bytes())
        .expect("signature")
}

fn succeeded_event(order_id: &str) -> String {
    json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_external_1",
            "metadata": { "order_id": order_id },
            "latest_charge": "ch_1"
        }}
    })
    .to_string()
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = app!(state());
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn cart_quote_and_checkout() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/cart/s1/items")
        .set_json(pilot_wings())
        .to_request();
    let cart: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cart["items"][0]["product_id"], "1");
    assert_eq!(cart["items"][0]["name"], "T-shirt Pilot Wings");
    assert_eq!(cart["items"][0]["unit_price"], "25.99");

    let req = test::TestRequest::get()
        .uri("/api/cart/s1/quote?country=FR")
        .to_request();
    let totals: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(totals["subtotal"], "25.99");
    assert_eq!(totals["shipping"], "5.99");
    assert_eq!(totals["tax"], "6.40");
    assert_eq!(totals["total"], "38.38");

    let req = test::TestRequest::post()
        .uri("/api/checkout/s1")
        .set_json(checkout_body("tok_visa"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["status"], "paid");
    assert_eq!(body["order"]["total"], "38.38");

    let req = test::TestRequest::get().uri("/api/cart/s1").to_request();
    let cart: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));

    let req = test::TestRequest::get().uri("/api/sales").to_request();
    let sales: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(sales.as_array().map(Vec::len), Some(1));
    assert_eq!(sales[0]["product_name"], "T-shirt Pilot Wings");
}

#[actix_web::test]
async fn declined_checkout_keeps_the_cart() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/cart/s2/items")
        .set_json(pilot_wings())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/checkout/s2")
        .set_json(checkout_body("tok_chargeDeclined"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().is_some());
    let declined_id = body["order_id"].as_str().map(str::to_string);
    assert!(declined_id.is_some());

    let req = test::TestRequest::get().uri("/api/cart/s2").to_request();
    let cart: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));

    // A declined order stays failed; the next attempt is a new order.
    let req = test::TestRequest::post()
        .uri("/api/checkout/s2")
        .set_json(checkout_body("tok_visa"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["order"]["status"], "paid");
    assert_ne!(body["order"]["order_id"].as_str().map(str::to_string), declined_id);
}

#[actix_web::test]
async fn provider_outage_is_retryable_without_a_second_order() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/cart/s3/items")
        .set_json(pilot_wings())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/checkout/s3")
        .set_json(checkout_body("tok_unavailable"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    let pending_id = body["order_id"].as_str().map(str::to_string);
    assert!(pending_id.is_some());

    let req = test::TestRequest::post()
        .uri("/api/checkout/s3")
        .set_json(checkout_body("tok_visa"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["order"]["status"], "paid");
    assert_eq!(body["order"]["order_id"].as_str().map(str::to_string), pending_id);

    let req = test::TestRequest::get().uri("/api/orders").to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 1);
}

#[actix_web::test]
async fn checkout_rejects_invalid_customer() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/cart/s4/items")
        .set_json(pilot_wings())
        .to_request();
    test::call_service(&app, req).await;

    let mut body = checkout_body("tok_visa");
    body["customer"]["email"] = json!("not-an-email");
    let req = test::TestRequest::post()
        .uri("/api/checkout/s4")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let app = app!(state());
    let req = test::TestRequest::post()
        .uri("/api/cart/s5/items")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().is_some());
}

#[actix_web::test]
async fn order_crud_and_fulfilment() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer": customer(),
            "items": [pilot_wings()],
            "payment_method": "card"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["order"]["status"], "pending");
    let id = body["order"]["order_id"].as_str().unwrap_or_default().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{}", id))
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order["total"], "38.38");

    // Only paid orders can be fulfilled.
    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{}/fulfill", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{}", uuid::Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Not found");

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({ "items": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_marks_order_paid_once() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer": customer(),
            "items": [{ "id": "8", "quantity": 2 }],
            "payment_method": "card"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["order"]["order_id"].as_str().unwrap_or_default().to_string();

    let payload = succeeded_event(&id);
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/stripe-webhook")
            .insert_header(("Stripe-Signature", signed(&payload)))
            .insert_header(("content-type", "application/json"))
            .set_payload(payload.clone())
            .to_request();
        let ack: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ack["received"], true);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{}", id))
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order["status"], "paid");

    // One record per unit, written once despite the duplicate delivery.
    let req = test::TestRequest::get().uri("/api/sales/summary").to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["total_sales"], 2);
    assert_eq!(summary["best_product"], "Badge Pilote");
    assert_eq!(summary["category_sales"][0]["category"], "accessories");
    assert_eq!(summary["category_sales"][0]["units"], 2);
    assert_eq!(summary["category_sales"][1]["category"], "tshirts");
    assert_eq!(summary["category_sales"][1]["units"], 0);

    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{}/fulfill", id))
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order["status"], "fulfilled");
}

#[actix_web::test]
async fn webhook_without_valid_signature_is_rejected() {
    let app = app!(state());
    let payload = succeeded_event(&uuid::Uuid::new_v4().to_string());

    let req = test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let text = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&text).starts_with("Webhook Error:"));

    let forged = signature_header("whsec_other", chrono::Utc::now().timestamp(), payload.as_bytes())
        .expect("signature");
    let req = test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .insert_header(("Stripe-Signature", forged))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_for_unknown_order_is_acknowledged() {
    let app = app!(state());
    let payload = succeeded_event(&uuid::Uuid::new_v4().to_string());

    let req = test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .insert_header(("Stripe-Signature", signed(&payload)))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn payment_intent_enforces_the_minimum() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .set_json(json!({ "amount": 0.3, "customer_details": { "email": "ada@example.com" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .set_json(json!({ "amount": "38.38" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["client_secret"]
        .as_str()
        .is_some_and(|s| s.starts_with("pi_sandbox_")));
    assert!(body["order_id"].as_str().is_some());
}

#[actix_web::test]
async fn confirmation_email_requires_a_valid_address() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer": customer(),
            "items": [pilot_wings()],
            "payment_method": "card"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["order"]["order_id"].as_str().unwrap_or_default().to_string();

    let req = test::TestRequest::post()
        .uri("/api/send-confirmation-email")
        .set_json(json!({ "orderId": id, "email": "nope" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/send-confirmation-email")
        .set_json(json!({ "orderId": id, "email": "ada@example.com" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn huge_page_number_returns_an_empty_page() {
    let app = app!(state());
    let req = test::TestRequest::get()
        .uri("/api/orders?page=9223372036854775807&limit=100")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn catalog_crud() {
    let app = app!(state());

    let req = test::TestRequest::get().uri("/api/products").to_request();
    let products: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(products.as_array().map(Vec::len), Some(8));

    let req = test::TestRequest::post()
        .uri("/api/products")
        .set_json(json!({
            "id": 9,
            "name": "Gants de vol",
            "category": "accessories",
            "price": 22.5,
            "icon": "fas fa-mitten"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["product_id"], "9");
    assert_eq!(created["price"], "22.50");

    let req = test::TestRequest::post()
        .uri("/api/products")
        .set_json(json!({ "id": "9", "name": "Again", "category": "accessories", "price": "1.00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/products")
        .set_json(json!({ "name": "Free lunch", "category": "food", "price": "-1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri("/api/products/9")
        .set_json(json!({ "name": "Gants de vol", "category": "accessories", "price": "19.99" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["price"], "19.99");
    assert_eq!(updated["icon"], Value::Null);

    let req = test::TestRequest::get().uri("/api/products/9").to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["price"], "19.99");

    let req = test::TestRequest::delete().uri("/api/products/9").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/api/products/9").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri("/api/products/9")
        .set_json(json!({ "name": "Gants", "category": "accessories", "price": "1.00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cart_rejects_products_outside_the_catalog() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/cart/s9/items")
        .set_json(json!({ "id": "hoodie", "name": "Hoodie", "price": 0.01, "quantity": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().is_some_and(|e| e.contains("unknown product")));

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer": customer(),
            "items": [{ "id": "hoodie", "quantity": 1 }],
            "payment_method": "card"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn catalog_price_change_reaches_the_quote() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/cart/s10/items")
        .set_json(pilot_wings())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri("/api/products/1")
        .set_json(json!({ "name": "T-shirt Pilot Wings", "category": "tshirts", "price": "30.00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/cart/s10/quote?country=FR")
        .to_request();
    let totals: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(totals["subtotal"], "30.00");
}

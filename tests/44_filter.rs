mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{bootcamp_body, id_of, TestApp, BOSTON_ADDRESS, LOWELL_ADDRESS};
use devcamper_api::config::TotalCount;
use serde_json::{json, Value};

/// Alpha (Boston, 5000, housing), Beta (Lowell, 12000), Gamma (Boston, no courses).
async fn seeded(app: &TestApp) -> Result<()> {
    let admin = app.admin("admin@example.com").await?;

    let alpha = id_of(&app.create_bootcamp(&admin, "Alpha", BOSTON_ADDRESS).await?);
    app.create_course(&admin, &alpha, "Alpha Course", 5000.0).await?;

    let mut beta = bootcamp_body("Beta", LOWELL_ADDRESS);
    beta["housing"] = json!(false);
    beta["careers"] = json!(["Data Science"]);
    let res = app.post("/api/v1/bootcamps", Some(&admin), beta).await?;
    anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {}", res.body);
    let beta = id_of(&res.body["data"]);
    app.create_course(&admin, &beta, "Beta Course", 12000.0).await?;

    let mut gamma = bootcamp_body("Gamma", BOSTON_ADDRESS);
    gamma["housing"] = json!(false);
    gamma["careers"] = json!(["Mobile Development"]);
    let res = app.post("/api/v1/bootcamps", Some(&admin), gamma).await?;
    anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {}", res.body);
    Ok(())
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|b| b["name"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn comparison_and_equality_filters() -> Result<()> {
    let app = TestApp::new()?;
    seeded(&app).await?;

    let res = app.get("/api/v1/bootcamps?averageCost%5Blte%5D=10000").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(names(&res.body), vec!["Alpha"]);

    let res = app.get("/api/v1/bootcamps?averageCost%5Bgt%5D=1000&sort=-averageCost").await?;
    assert_eq!(names(&res.body), vec!["Beta", "Alpha"]);

    let res = app.get("/api/v1/bootcamps?housing=true").await?;
    assert_eq!(names(&res.body), vec!["Alpha"]);

    let res = app.get("/api/v1/bootcamps?careers%5Bin%5D=Data+Science,Mobile+Development&sort=name").await?;
    assert_eq!(names(&res.body), vec!["Beta", "Gamma"]);

    let res = app.get("/api/v1/courses?tuition%5Bgte%5D=10000").await?;
    assert_eq!(res.body["count"], json!(1));
    assert_eq!(res.body["data"][0]["title"], json!("Beta Course"));
    Ok(())
}

#[tokio::test]
async fn select_and_sort() -> Result<()> {
    let app = TestApp::new()?;
    seeded(&app).await?;

    let res = app.get("/api/v1/bootcamps?select=name,housing&sort=-name").await?;
    assert_eq!(names(&res.body), vec!["Gamma", "Beta", "Alpha"]);
    let first = res.body["data"][0].as_object().cloned().unwrap_or_default();
    let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["courses", "housing", "id", "name"]);

    // courses survive projection on bootcamp listings
    let res = app.get("/api/v1/bootcamps?select=name&sort=name").await?;
    assert_eq!(res.body["data"][0]["courses"][0]["title"], json!("Alpha Course"));

    // newest first by default
    let res = app.get("/api/v1/bootcamps").await?;
    assert_eq!(names(&res.body), vec!["Gamma", "Beta", "Alpha"]);

    let res = app.get("/api/v1/courses?select=title").await?;
    assert!(res.body["data"][0].get("bootcamp").is_none());
    let res = app.get("/api/v1/courses?select=title,bootcamp&sort=title").await?;
    assert_eq!(res.body["data"][0]["bootcamp"]["name"], json!("Alpha"));
    Ok(())
}

#[tokio::test]
async fn pagination_links() -> Result<()> {
    let app = TestApp::new()?;
    seeded(&app).await?;

    let res = app.get("/api/v1/bootcamps?sort=name&limit=1").await?;
    assert_eq!(names(&res.body), vec!["Alpha"]);
    assert_eq!(res.body["count"], json!(1));
    assert_eq!(res.body["pagination"]["next"], json!({"page": 2, "limit": 1}));
    assert_eq!(res.body["pagination"]["prev"], Value::Null);

    let res = app.get("/api/v1/bootcamps?sort=name&limit=1&page=2").await?;
    assert_eq!(names(&res.body), vec!["Beta"]);
    assert_eq!(res.body["pagination"]["next"], json!({"page": 3, "limit": 1}));
    assert_eq!(res.body["pagination"]["prev"], json!({"page": 1, "limit": 1}));

    let res = app.get("/api/v1/bootcamps?sort=name&limit=1&page=3").await?;
    assert_eq!(names(&res.body), vec!["Gamma"]);
    assert_eq!(res.body["pagination"]["next"], Value::Null);

    let res = app.get("/api/v1/bootcamps?page=9").await?;
    assert_eq!(res.body["count"], json!(0));
    assert_eq!(res.body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn total_count_modes() -> Result<()> {
    let filtered = TestApp::new()?;
    seeded(&filtered).await?;
    let res = filtered.get("/api/v1/bootcamps?housing=false&limit=2").await?;
    assert_eq!(res.body["count"], json!(2));
    assert_eq!(res.body["pagination"]["next"], Value::Null);

    let whole = TestApp::with_config(|config| config.query.total_count = TotalCount::Collection)?;
    seeded(&whole).await?;
    let res = whole.get("/api/v1/bootcamps?housing=false&limit=2").await?;
    assert_eq!(res.body["count"], json!(2));
    assert_eq!(res.body["pagination"]["next"], json!({"page": 2, "limit": 2}));
    Ok(())
}

#[tokio::test]
async fn limit_is_capped() -> Result<()> {
    let app = TestApp::with_config(|config| config.query.max_limit = 2)?;
    seeded(&app).await?;

    let res = app.get("/api/v1/bootcamps?limit=50").await?;
    assert_eq!(res.body["count"], json!(2));
    assert_eq!(res.body["pagination"]["next"], json!({"page": 2, "limit": 2}));
    Ok(())
}

#[tokio::test]
async fn invalid_queries_are_bad_requests() -> Result<()> {
    let app = TestApp::new()?;
    seeded(&app).await?;

    for uri in [
        "/api/v1/bootcamps?page=0",
        "/api/v1/bootcamps?limit=abc",
        "/api/v1/bootcamps?price=10",
        "/api/v1/bootcamps?averageCost%5Bgt%5D=lots",
        "/api/v1/bootcamps?averageCost%5Bnear%5D=5",
    ] {
        let res = app.get(uri).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(res.body["success"], json!(false), "{}", uri);
    }
    Ok(())
}

/*!
# View Set Benchmarks

Cost of compiling view sets into routes, and of requests served by
synthesized handlers.

## Usage

```bash
cargo bench --bench viewset_benchmarks

# Quick run with fewer samples
cargo bench --bench viewset_benchmarks -- --quick
```

HTML reports are generated in `target/criterion/report/index.html`.
*/

use axum::{
    Router,
    body::Body,
    http::{Method, Request},
};
use criterion::{Criterion, criterion_group, criterion_main};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::{hint::black_box, sync::Arc, time::Duration};
use tokio::runtime::Runtime;
use tower::ServiceExt;

use viewcrate::{
    ApiRouter,
    config::Settings,
    logging::{LogConfig, LogRegistry},
    openapi,
    sample::{self, AppState, company, migration::Migrator, position, user},
};

async fn setup_app() -> Router {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let (logs, _subscriber) =
        LogRegistry::build(&LogConfig::default()).expect("Failed to build log sinks");
    let settings = Settings::from_lookup(|_| None).expect("Default settings are valid");
    sample::router(AppState {
        db,
        logs: Arc::new(logs),
        settings: Arc::new(settings),
    })
}

async fn request(app: &Router, method: Method, uri: &str, body: Option<&str>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    black_box(response.status());
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("Registration");

    group.bench_function("register_sample_viewsets", |b| {
        b.iter(|| {
            let mut router = ApiRouter::<AppState>::new("/user");
            user::viewset().register(&mut router);
            company::viewset().register(&mut router);
            position::viewset().register(&mut router);
            black_box(router.routes().len())
        });
    });

    group.bench_function("openapi_document", |b| {
        let mut router = ApiRouter::<AppState>::new("/user");
        user::viewset().register(&mut router);
        company::viewset().register(&mut router);
        position::viewset().register(&mut router);
        let (_, routes) = router.finish();
        b.iter(|| black_box(openapi::document("viewcrate", "bench", &routes)));
    });

    group.finish();
}

fn bench_synthesized_handlers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let app = rt.block_on(async {
        let app = setup_app().await;
        for i in 0..50 {
            let body = format!(r#"{{"name":"Company {i}"}}"#);
            request(&app, Method::POST, "/api/sample/user/company", Some(&body)).await;
        }
        app
    });

    let mut group = c.benchmark_group("Synthesized Handlers");
    group.bench_function("get", |b| {
        b.iter(|| rt.block_on(request(&app, Method::GET, "/api/sample/user/company/25", None)));
    });
    group.bench_function("all", |b| {
        b.iter(|| rt.block_on(request(&app, Method::GET, "/api/sample/user/company/all", None)));
    });
    group.bench_function("update", |b| {
        b.iter(|| {
            rt.block_on(request(
                &app,
                Method::PATCH,
                "/api/sample/user/company/25",
                Some(r#"{"name":"Renamed"}"#),
            ));
        });
    });
    group.finish();
}

fn configure_criterion() -> Criterion {
    Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
        .sample_size(50)
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = bench_registration, bench_synthesized_handlers
}
criterion_main!(benches);

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use faas_router::dispatcher::Dispatcher;
use faas_router::event::InvocationContext;
use faas_router::response::Response;
use faas_router::router::{PathTrie, RouteMethod, RouteOptions, Router};
use http::Method;
use serde_json::json;

const ROUTES: &[(&str, &str)] = &[
    ("GET", "/"),
    ("GET", "/zoo/animals"),
    ("POST", "/zoo/animals"),
    ("GET", "/zoo/animals/{id}"),
    ("PUT", "/zoo/animals/{id}"),
    ("PATCH", "/zoo/animals/{id}"),
    ("DELETE", "/zoo/animals/{id}"),
    ("GET", "/zoo/animals/{id}/toys/{toy_id}"),
    (
        "GET",
        "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
    ),
    (
        "POST",
        "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
    ),
    ("GET", "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}"),
    ("HEAD", "/zoo/health"),
    ("ANY", "/files/{path+}"),
];

const PATHS: &[(Method, &str)] = &[
    (Method::GET, "/zoo/animals/123"),
    (Method::GET, "/zoo/animals/123/toys/456"),
    (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
    (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
    (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
    (Method::DELETE, "/files/a/b/c.txt"),
];

fn build_router() -> Router<usize> {
    let mut router = Router::default();
    for (i, (method, template)) in ROUTES.iter().enumerate() {
        let method: RouteMethod = method.parse().expect("valid method");
        router
            .add(method, template, RouteOptions::default(), i)
            .expect("unique route");
    }
    router
}

fn bench_trie_resolve(c: &mut Criterion) {
    let mut trie = PathTrie::new();
    for (i, (method, template)) in ROUTES.iter().enumerate() {
        let method: RouteMethod = method.parse().expect("valid method");
        trie.store(method, template, i).expect("unique route");
    }
    c.bench_function("trie_resolve", |b| {
        b.iter(|| {
            for (method, path) in PATHS {
                black_box(trie.resolve(method, black_box(path)));
            }
        })
    });
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = build_router();
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in PATHS {
                black_box(router.route(method, black_box(path)));
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");
    let mut app = Dispatcher::new();
    app.get("/zoo/animals/{id}", |req| async move {
        Ok(Response::new(json!({ "id": req.get_path_param("id") })))
    })
    .expect("unique route");
    let event = json!({ "httpMethod": "GET", "path": "/zoo/animals/123" });

    c.bench_function("dispatch_http_event", |b| {
        b.iter(|| {
            let out = rt.block_on(app.handle(event.clone(), InvocationContext::default()));
            black_box(out)
        })
    });
}

criterion_group!(
    benches,
    bench_trie_resolve,
    bench_route_throughput,
    bench_dispatch
);
criterion_main!(benches);

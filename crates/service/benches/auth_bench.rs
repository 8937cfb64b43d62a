use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use service::auth::domain::{AuthUser, LoginInput};
use service::auth::repository::mock::MockAuthRepository;
use service::auth::service::{AuthConfig, AuthService};

fn bench_login(c: &mut Criterion) {
    let repo = Arc::new(MockAuthRepository::default());
    let user = repo.insert_user(AuthUser {
        id: uuid::Uuid::new_v4(),
        email: "bench@example.com".into(),
        first_name: "Bench".into(),
        last_name: "Mark".into(),
        active: true,
        role: Some("ADMIN".into()),
    });
    let svc = AuthService::new(repo, AuthConfig::new("secret", 3600));

    // password is hashed once, outside the measured loop
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(svc.set_password(user.id, "Benchmark1")).unwrap();

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            let _ = rt
                .block_on(svc.login(LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() }))
                .unwrap();
        });
    });
}

fn bench_verify_token(c: &mut Criterion) {
    let svc = AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig::new("secret", 3600));
    let token = svc.issue_token(uuid::Uuid::new_v4()).unwrap();
    c.bench_function("auth_verify_token", |b| b.iter(|| svc.verify_token(&token).unwrap()));
}

criterion_group!(benches, bench_login, bench_verify_token);
criterion_main!(benches);

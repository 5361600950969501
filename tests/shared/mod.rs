#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use check_user_backend::{
    AppState,
    cache::PhoneCache,
    database::{InsertOutcome, UserRecord, UserSession, UserStore},
    error::{CacheError, StoreError},
    registration::UserRegistrationService,
    router::create_router,
};
use tokio::sync::{Barrier, OwnedSemaphorePermit, Semaphore};
use tower::ServiceExt;

pub fn check_user_request(username: &str, phone: &str) -> Request<Body> {
    json_request(serde_json::json!({ "username": username, "phone": phone }).to_string())
}

pub fn json_request(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/check-user")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .expect("valid request")
}

pub async fn send_to(state: AppState, request: Request<Body>) -> Asserter {
    let response = create_router(state)
        .oneshot(request)
        .await
        .unwrap(/* Infallible */);
    Asserter::from(response)
}

pub struct TestClient {
    pub store: Arc<MemoryUserStore>,
    pub cache: Arc<MemoryPhoneCache>,
    state: AppState,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_parts(MemoryUserStore::new(10), None)
    }

    pub fn with_parts(store: MemoryUserStore, cache_ttl: Option<Duration>) -> Self {
        let store = Arc::new(store);
        let cache = Arc::new(MemoryPhoneCache::default());
        let state = AppState {
            registrations: UserRegistrationService::new(store.clone(), cache.clone(), cache_ttl),
        };
        Self {
            store,
            cache,
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Asserter {
        send_to(self.state.clone(), request).await
    }

    pub async fn check_user(&self, username: &str, phone: &str) -> Asserter {
        self.send(check_user_request(username, phone)).await
    }
}

pub struct Asserter {
    response: Response<Body>,
}

impl Asserter {
    pub fn status(self, expected: u16) -> Self {
        assert_eq!(
            self.response.status().as_u16(),
            expected,
            "expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    pub fn status_code(&self) -> u16 {
        self.response.status().as_u16()
    }

    pub async fn json_body(self, expected: serde_json::Value) {
        let body_bytes = to_bytes(self.response.into_body(), usize::MAX)
            .await
            .expect("unable to read response body");
        let body: serde_json::Value =
            serde_json::from_slice(&body_bytes).expect("unable to deserialize response body");
        assert_eq!(body, expected);
    }
}

impl From<Response<Body>> for Asserter {
    fn from(response: Response<Body>) -> Self {
        Self { response }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Checkout,
    Find,
    Insert,
    Commit,
}

struct StoreInner {
    users: Mutex<HashMap<String, String>>,
    permits: Arc<Semaphore>,
    pool_size: usize,
    checkouts: AtomicUsize,
    queries: AtomicUsize,
    fail_at: Mutex<Option<FailPoint>>,
    find_barrier: Option<Barrier>,
}

/// 内存用户表，连接池用信号量模拟
pub struct MemoryUserStore {
    inner: Arc<StoreInner>,
}

impl MemoryUserStore {
    pub fn new(pool_size: usize) -> Self {
        Self::build(pool_size, None)
    }

    /// 查询之后在屏障处等待 `parties` 个会话，用于构造并发注册
    pub fn with_find_barrier(pool_size: usize, parties: usize) -> Self {
        Self::build(pool_size, Some(Barrier::new(parties)))
    }

    fn build(pool_size: usize, find_barrier: Option<Barrier>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                users: Mutex::new(HashMap::new()),
                permits: Arc::new(Semaphore::new(pool_size)),
                pool_size,
                checkouts: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
                fail_at: Mutex::new(None),
                find_barrier,
            }),
        }
    }

    pub fn seed(&self, username: &str, phone: &str) {
        self.inner
            .users
            .lock()
            .unwrap()
            .insert(username.to_string(), phone.to_string());
    }

    pub fn phone_of(&self, username: &str) -> Option<String> {
        self.inner.users.lock().unwrap().get(username).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.inner.users.lock().unwrap().len()
    }

    pub fn fail_at(&self, point: Option<FailPoint>) {
        *self.inner.fail_at.lock().unwrap() = point;
    }

    pub fn checked_out(&self) -> usize {
        self.inner.pool_size - self.inner.permits.available_permits()
    }

    pub fn checkouts(&self) -> usize {
        self.inner.checkouts.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }

    /// 在测试中直接占用一个连接
    pub async fn hold_connection(&self) -> OwnedSemaphorePermit {
        self.inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore open")
    }
}

fn check_fail(inner: &StoreInner, point: FailPoint) -> Result<(), StoreError> {
    if *inner.fail_at.lock().unwrap() == Some(point) {
        return Err(StoreError::Backend(format!("injected failure at {:?}", point)));
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn checkout(&self) -> Result<Box<dyn UserSession>, StoreError> {
        check_fail(&self.inner, FailPoint::Checkout)?;
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.inner.checkouts.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySession {
            inner: self.inner.clone(),
            _permit: permit,
            uncommitted: Vec::new(),
            committed: false,
        }))
    }
}

struct MemorySession {
    inner: Arc<StoreInner>,
    _permit: OwnedSemaphorePermit,
    uncommitted: Vec<String>,
    committed: bool,
}

#[async_trait]
impl UserSession for MemorySession {
    async fn find_user(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.queries.fetch_add(1, Ordering::SeqCst);
        check_fail(&self.inner, FailPoint::Find)?;

        let found = self
            .inner
            .users
            .lock()
            .unwrap()
            .get(username)
            .map(|phone| UserRecord::new(username, phone.clone()));

        if let Some(barrier) = &self.inner.find_barrier {
            barrier.wait().await;
        }
        Ok(found)
    }

    async fn insert_user(&mut self, user: &UserRecord) -> Result<InsertOutcome, StoreError> {
        check_fail(&self.inner, FailPoint::Insert)?;

        let mut users = self.inner.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        users.insert(user.username.clone(), user.phone.clone());
        self.uncommitted.push(user.username.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        check_fail(&self.inner, FailPoint::Commit)?;
        let mut session = self;
        session.committed = true;
        Ok(())
    }
}

// 未提交的插入在归还连接时回滚
impl Drop for MemorySession {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut users = self.inner.users.lock().unwrap();
        for username in self.uncommitted.drain(..) {
            users.remove(&username);
        }
    }
}

#[derive(Default)]
pub struct MemoryPhoneCache {
    entries: Mutex<HashMap<String, (String, Option<Duration>)>>,
    gets: AtomicUsize,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
}

impl MemoryPhoneCache {
    pub fn seed(&self, username: &str, phone: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(username.to_string(), (phone.to_string(), None));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn phone_of(&self, username: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(username)
            .map(|(phone, _)| phone.clone())
    }

    pub fn ttl_of(&self, username: &str) -> Option<Duration> {
        self.entries
            .lock()
            .unwrap()
            .get(username)
            .and_then(|(_, ttl)| *ttl)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PhoneCache for MemoryPhoneCache {
    async fn get(&self, username: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("injected get failure".into()));
        }
        Ok(self.phone_of(username))
    }

    async fn set(
        &self,
        username: &str,
        phone: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("injected set failure".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(username.to_string(), (phone.to_string(), ttl));
        Ok(())
    }
}

//! The decision-flow orchestrator (§4.10): the one piece that ties every
//! other component together into the INIT → {SERVE_FROM_CACHE, REVALIDATE,
//! CALL_BACKEND, SERVE_STALE_WITH_WARNING} state machine.

use std::sync::Arc;

use http::{HeaderValue, Method, StatusCode};
use log::{debug, warn};

use crate::backend::{
    Backend, CacheStatus, CallContext, CancellationToken, RawRequest, RawResponse, Route,
};
use crate::cache_control::CacheControl;
use crate::clock::Clock;
use crate::compliance::ProtocolCompliance;
use crate::config::{CacheConfig, CacheMode};
use crate::conditional::{collect_variant_etags, ConditionalRequestBuilder};
use crate::entry::{CacheEntry, EntryKind};
use crate::error::{CacheError, Result};
use crate::generator::{GeneratedResponse, LookupStatus, ResponseGenerator};
use crate::headers::HeaderList;
use crate::invalidator::Invalidator;
use crate::key::{self, StorageKey};
use crate::request_policy::RequestPolicy;
use crate::resource::ResourceFactory;
use crate::response_policy::ResponsePolicy;
use crate::revalidator::AsynchronousRevalidator;
use crate::storage::Storage;
use crate::suitability::{Suitability, SuitabilityChecker};
use crate::updater::EntryUpdater;
use crate::validity::ValidityPolicy;

/// The unsafe methods that bypass cache lookup entirely and trigger
/// invalidation on a successful response (§4.8).
const UNSAFE_METHODS: &[&str] = &["POST", "PUT", "DELETE", "PATCH"];

/// What `CachingExecutor::lookup` found at a primary storage key.
enum LookupOutcome {
    /// Nothing stored under this key at all.
    NoEntry,
    /// A variant parent is stored, but no variant matches this request's
    /// `Vary`-relevant headers. Distinct from `NoEntry` because the parent
    /// still carries sibling variants' ETags, usable for a conditional
    /// backend call (§8 scenario 4).
    NegotiatedMiss { parent: Arc<CacheEntry> },
    Hit(Arc<CacheEntry>),
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Ties a `Storage`, a `ResourceFactory`, a `Backend`, a `Clock`, and a
/// `CacheConfig` together and runs the full decision flow for each request.
/// Owns its `AsynchronousRevalidator` rather than reaching for a
/// process-wide singleton, per the design note against mutable-singleton
/// revalidation queues.
pub struct CachingExecutor<S, F, B> {
    storage: Arc<S>,
    resources: Arc<F>,
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    revalidator: Arc<AsynchronousRevalidator>,
}

impl<S, F, B> CachingExecutor<S, F, B>
where
    S: Storage + 'static,
    F: ResourceFactory + 'static,
    B: Backend + 'static,
{
    pub fn new(storage: Arc<S>, resources: Arc<F>, backend: Arc<B>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        let revalidator = Arc::new(AsynchronousRevalidator::new(&config));
        CachingExecutor { storage, resources, backend, clock, config, revalidator }
    }

    /// Runs the full decision flow for one request against `route`.
    pub async fn execute(
        &self,
        route: Route,
        mut request: RawRequest,
        cancellation: CancellationToken,
    ) -> Result<(RawResponse, CallContext)> {
        let mut ctx = CallContext::new();

        request.version = ProtocolCompliance::normalize_version(request.version);

        let has_body = request.body.as_ref().map(|b| !b.is_empty()).unwrap_or(false);
        ProtocolCompliance::strip_expect_continue_without_body(&mut request.headers, has_body);

        if let Some(_failure) = ProtocolCompliance::check_fatal(&request.method, &request.headers) {
            ctx.status = Some(CacheStatus::CacheModuleResponse);
            return Ok((local_response(StatusCode::BAD_REQUEST, &self.config), ctx));
        }

        if ProtocolCompliance::decrement_max_forwards(&request.method, &mut request.headers) {
            ctx.status = Some(CacheStatus::CacheModuleResponse);
            return Ok((local_response(StatusCode::OK, &self.config), ctx));
        }

        let primary_key = StorageKey::build(&route.scheme, &route.host, &route.uri);

        if UNSAFE_METHODS.contains(&request.method.as_str()) {
            return self.call_backend_unsafe(&route, &request, &primary_key, &cancellation, &mut ctx).await;
        }

        if !RequestPolicy::admissible(
            &http_request_for(&request),
            &request.headers,
        ) || self.config.resolve_cache_mode(&http_request_for(&request)) == CacheMode::NoStore
        {
            return self.call_backend(&route, &request, &primary_key, &cancellation, &mut ctx, LookupStatus::Miss).await;
        }

        let cc = CacheControl::parse(&request.headers);
        let only_if_cached = cc.only_if_cached()
            || self.config.resolve_cache_mode(&http_request_for(&request)) == CacheMode::OnlyIfCached;

        let entry = match self.lookup(&primary_key, &request.headers).await? {
            LookupOutcome::Hit(entry) => entry,
            LookupOutcome::NoEntry => {
                if only_if_cached {
                    ctx.status = Some(CacheStatus::CacheModuleResponse);
                    return Ok((local_response(StatusCode::GATEWAY_TIMEOUT, &self.config), ctx));
                }
                return self.call_backend(&route, &request, &primary_key, &cancellation, &mut ctx, LookupStatus::Miss).await;
            }
            LookupOutcome::NegotiatedMiss { parent } => {
                if only_if_cached {
                    ctx.status = Some(CacheStatus::CacheModuleResponse);
                    return Ok((local_response(StatusCode::GATEWAY_TIMEOUT, &self.config), ctx));
                }
                return self
                    .call_backend_negotiated(&route, &request, &primary_key, &parent, &cancellation, &mut ctx)
                    .await;
            }
        };

        let now = self.clock.now();
        let suitability = SuitabilityChecker::new(&self.config).check(
            &http_request_for(&request),
            &request.headers,
            &entry,
            now,
        );

        match suitability {
            Suitability::Suitable => {
                ctx.status = Some(CacheStatus::CacheHit);
                let generator = ResponseGenerator::new(&self.config);
                let generated = generator.generate(
                    &http_request_for(&request),
                    &request.headers,
                    &entry,
                    now,
                    LookupStatus::Hit,
                );
                Ok((materialize(generated, &entry), ctx))
            }
            Suitability::SuitableStaleAllowed => {
                ctx.status = Some(CacheStatus::CacheHit);
                let validity = ValidityPolicy::new(&self.config);
                let age = validity.age(&entry, now);
                if validity.stale_while_revalidate_allowed(&entry, &age) {
                    self.schedule_background_revalidation(route.clone(), request.clone(), primary_key.clone());
                }
                let generator = ResponseGenerator::new(&self.config);
                let generated = generator.generate(
                    &http_request_for(&request),
                    &request.headers,
                    &entry,
                    now,
                    LookupStatus::Hit,
                );
                Ok((materialize(generated, &entry), ctx))
            }
            Suitability::MustRevalidate => {
                self.revalidate(&route, &request, &primary_key, &entry, &cancellation, &mut ctx).await
            }
            Suitability::Unusable => {
                self.call_backend(&route, &request, &primary_key, &cancellation, &mut ctx, LookupStatus::Hit).await
            }
        }
    }

    /// Resolves a possibly-variant primary entry down to the concrete leaf
    /// that matches `request_headers`. Distinguishes "nothing stored at all"
    /// from "a variant parent is stored but none of its variants match this
    /// request" — the latter still carries known ETags a conditional
    /// backend call can use (§8 scenario 4), the former has nothing to be
    /// conditional about.
    async fn lookup(
        &self,
        primary_key: &StorageKey,
        request_headers: &HeaderList,
    ) -> Result<LookupOutcome> {
        let entry = match self.storage.get(primary_key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!("storage read failed for {primary_key}: {err}");
                None
            }
        };
        let Some(entry) = entry else { return Ok(LookupOutcome::NoEntry) };

        if !entry.is_variant_parent() {
            return Ok(LookupOutcome::Hit(entry));
        }

        let field_names = entry.vary_field_names();
        if key::vary_is_star(&field_names) {
            return Ok(LookupOutcome::NegotiatedMiss { parent: entry });
        }
        let variant_key = key::variant_key(&field_names, request_headers);
        match entry.variant_storage_key(&variant_key) {
            Some(storage_key) => match self.storage.get(storage_key).await {
                Ok(Some(variant)) => Ok(LookupOutcome::Hit(variant)),
                Ok(None) => Ok(LookupOutcome::NegotiatedMiss { parent: entry }),
                Err(err) => {
                    warn!("storage read failed for variant {storage_key}: {err}");
                    Ok(LookupOutcome::NegotiatedMiss { parent: entry })
                }
            },
            None => Ok(LookupOutcome::NegotiatedMiss { parent: entry }),
        }
    }

    /// A negotiated miss still knows every sibling variant's `ETag`, so
    /// instead of the unconditional `call_backend` path it sends those
    /// ETags as `If-None-Match`: the origin may answer `304` naming one of
    /// them (this request turned out to match an already-cached variant
    /// under a different `Vary` key) or `200` with a genuinely new variant.
    async fn call_backend_negotiated(
        &self,
        route: &Route,
        request: &RawRequest,
        primary_key: &StorageKey,
        parent: &Arc<CacheEntry>,
        cancellation: &CancellationToken,
        ctx: &mut CallContext,
    ) -> Result<(RawResponse, CallContext)> {
        let variant_etags = collect_variant_etags(self.storage.as_ref(), parent).await.unwrap_or_default();
        let cond_headers = ConditionalRequestBuilder.build(&http_request_for(request), parent, &variant_etags);
        let cond_request =
            RawRequest { method: request.method.clone(), headers: cond_headers, body: None, version: request.version };

        let request_time = self.clock.now();
        ctx.request_time = Some(request_time);
        let response = self.backend.execute(route, &cond_request, cancellation).await?;
        let response_time = self.clock.now();
        ctx.response_time = Some(response_time);

        let mut response = response;
        ProtocolCompliance::annotate(&mut response.headers, response_time, false);
        if ProtocolCompliance::strip_304_body_flag(response.status) {
            response.body.clear();
        }

        if response.status == StatusCode::NOT_MODIFIED {
            if let Some((variant_key, variant)) = self.matching_variant(parent, &response.headers).await {
                let merged = EntryUpdater::merge(&variant, &response.headers, request_time, response_time);
                self.cas_update(&variant_key, &variant, merged.clone()).await;
                let generator = ResponseGenerator::new(&self.config);
                let generated = generator.generate(
                    &http_request_for(request),
                    &request.headers,
                    &merged,
                    response_time,
                    LookupStatus::Hit,
                );
                ctx.status = Some(CacheStatus::Validated);
                return Ok((materialize(generated, &merged), ctx.clone()));
            }
            // The 304 didn't name any variant we recognize; we can't tell
            // which cached body it refers to, so fetch it properly instead
            // of guessing.
            let unconditional_headers = ConditionalRequestBuilder.unconditional(&http_request_for(request));
            let unconditional = RawRequest {
                method: request.method.clone(),
                headers: unconditional_headers,
                body: None,
                version: request.version,
            };
            return self.call_backend(route, &unconditional, primary_key, cancellation, ctx, LookupStatus::Miss).await;
        }

        let policy = ResponsePolicy::new(&self.config);
        let cacheable = policy.cacheable(
            &http_request_for(request),
            &request.headers,
            response.status,
            &response.headers,
            response.body.len() as u64,
        );
        if cacheable {
            if let Err(err) =
                self.store_response(primary_key, request, &response, request_time, response_time).await
            {
                warn!("storage write failed for {primary_key}: {err}");
            }
        }

        let generator = ResponseGenerator::new(&self.config);
        generator.annotate_miss(&mut response.headers);
        ctx.status = Some(CacheStatus::CacheMiss);
        Ok((response, ctx.clone()))
    }

    /// Finds the sibling variant (by storage key) whose stored `ETag`
    /// matches the one a `304` named, strong/weak prefix ignored.
    async fn matching_variant(
        &self,
        parent: &CacheEntry,
        response_headers: &HeaderList,
    ) -> Option<(StorageKey, Arc<CacheEntry>)> {
        let response_etag = response_headers.get(&"etag".parse().unwrap())?.to_str().ok()?;
        for key in parent.variant_storage_keys() {
            if let Ok(Some(variant)) = self.storage.get(&key).await {
                if let Some(etag) = variant.etag() {
                    if strip_weak(etag) == strip_weak(response_etag) {
                        return Some((key, variant));
                    }
                }
            }
        }
        None
    }

    async fn call_backend(
        &self,
        route: &Route,
        request: &RawRequest,
        primary_key: &StorageKey,
        cancellation: &CancellationToken,
        ctx: &mut CallContext,
        lookup: LookupStatus,
    ) -> Result<(RawResponse, CallContext)> {
        let request_time = self.clock.now();
        ctx.request_time = Some(request_time);
        let response = self.backend.execute(route, request, cancellation).await?;
        let response_time = self.clock.now();
        ctx.response_time = Some(response_time);

        let mut response = response;
        ProtocolCompliance::annotate(&mut response.headers, response_time, false);

        let policy = ResponsePolicy::new(&self.config);
        let cacheable = policy.cacheable(
            &http_request_for(request),
            &request.headers,
            response.status,
            &response.headers,
            response.body.len() as u64,
        );

        if cacheable {
            if let Err(err) = self
                .store_response(primary_key, request, &response, request_time, response_time)
                .await
            {
                warn!("storage write failed for {primary_key}: {err}");
            }
        }

        let generator = ResponseGenerator::new(&self.config);
        generator.annotate_miss(&mut response.headers);
        let _ = lookup;
        ctx.status = Some(CacheStatus::CacheMiss);
        Ok((response, ctx.clone()))
    }

    async fn call_backend_unsafe(
        &self,
        route: &Route,
        request: &RawRequest,
        primary_key: &StorageKey,
        cancellation: &CancellationToken,
        ctx: &mut CallContext,
    ) -> Result<(RawResponse, CallContext)> {
        let request_time = self.clock.now();
        let response = self.backend.execute(route, request, cancellation).await?;
        let response_time = self.clock.now();

        let mut response = response;
        ProtocolCompliance::annotate(&mut response.headers, response_time, false);

        if let Err(err) = Invalidator::flush(
            self.storage.as_ref(),
            &request.method,
            primary_key,
            response.status,
            &response.headers,
        )
        .await
        {
            warn!("invalidation failed for {primary_key}: {err}");
        }

        ctx.request_time = Some(request_time);
        ctx.response_time = Some(response_time);
        ctx.status = Some(CacheStatus::CacheMiss);
        Ok((response, ctx.clone()))
    }

    async fn revalidate(
        &self,
        route: &Route,
        request: &RawRequest,
        primary_key: &StorageKey,
        entry: &Arc<CacheEntry>,
        cancellation: &CancellationToken,
        ctx: &mut CallContext,
    ) -> Result<(RawResponse, CallContext)> {
        let variant_etags = if entry.is_variant_parent() {
            collect_variant_etags(self.storage.as_ref(), entry).await.unwrap_or_default()
        } else {
            Vec::new()
        };

        let cond_headers = ConditionalRequestBuilder.build(&http_request_for(request), entry, &variant_etags);
        let cond_request =
            RawRequest { method: request.method.clone(), headers: cond_headers, body: None, version: request.version };

        let request_time = self.clock.now();
        let outcome = self.backend.execute(route, &cond_request, cancellation).await;
        let response_time = self.clock.now();

        let mut response = match outcome {
            Ok(response) => response,
            Err(err) => return self.revalidation_failed(entry, err, ctx),
        };

        ProtocolCompliance::annotate(&mut response.headers, response_time, true);

        if ProtocolCompliance::strip_304_body_flag(response.status) {
            response.body.clear();
        }

        if response.status == StatusCode::NOT_MODIFIED {
            if EntryUpdater::is_stale_304(entry, &response.headers) {
                debug!("stale 304 for {primary_key}, retrying unconditionally");
                let unconditional_headers = ConditionalRequestBuilder.unconditional(&http_request_for(request));
                let unconditional = RawRequest {
                    method: request.method.clone(),
                    headers: unconditional_headers,
                    body: None,
                    version: request.version,
                };
                return self.call_backend(route, &unconditional, primary_key, cancellation, ctx, LookupStatus::Hit).await;
            }

            let merged = EntryUpdater::merge(entry, &response.headers, request_time, response_time);
            self.cas_update(primary_key, entry, merged.clone()).await;

            let generator = ResponseGenerator::new(&self.config);
            let generated = generator.generate(
                &http_request_for(request),
                &request.headers,
                &merged,
                response_time,
                LookupStatus::Hit,
            );
            ctx.status = Some(CacheStatus::Validated);
            return Ok((materialize(generated, &merged), ctx.clone()));
        }

        if response.status.is_success() {
            let policy = ResponsePolicy::new(&self.config);
            if policy.cacheable(
                &http_request_for(request),
                &request.headers,
                response.status,
                &response.headers,
                response.body.len() as u64,
            ) {
                if let Err(err) =
                    self.store_response(primary_key, request, &response, request_time, response_time).await
                {
                    warn!("storage write failed for {primary_key}: {err}");
                }
            }
            let generator = ResponseGenerator::new(&self.config);
            generator.annotate_validated(&mut response.headers);
            ctx.status = Some(CacheStatus::Validated);
            return Ok((response, ctx.clone()));
        }

        if response.status.is_server_error() {
            let validity = ValidityPolicy::new(&self.config);
            let age = validity.age(entry, response_time);
            if validity.stale_if_error_allowed(entry, &age) {
                let generator = ResponseGenerator::new(&self.config);
                let mut generated =
                    generator.generate(&http_request_for(request), &request.headers, entry, response_time, LookupStatus::Hit);
                generated.headers.append(
                    "warning".parse().unwrap(),
                    HeaderValue::from_static("111 - \"Revalidation failed\""),
                );
                ctx.status = Some(CacheStatus::CacheHit);
                return Ok((materialize(generated, entry), ctx.clone()));
            }
        }

        ctx.status = Some(CacheStatus::CacheMiss);
        Ok((response, ctx.clone()))
    }

    fn revalidation_failed(
        &self,
        entry: &Arc<CacheEntry>,
        err: CacheError,
        ctx: &mut CallContext,
    ) -> Result<(RawResponse, CallContext)> {
        let validity = ValidityPolicy::new(&self.config);
        let now = self.clock.now();
        let age = validity.age(entry, now);
        let must_revalidate = validity.must_revalidate(entry);

        if validity.stale_if_error_allowed(entry, &age) || !must_revalidate {
            warn!("synchronous revalidation failed, serving stale: {err}");
            let generator = ResponseGenerator::new(&self.config);
            let mut generated =
                generator.generate(&http_request_for_headerless(entry), &HeaderList::new(), entry, now, LookupStatus::Hit);
            generated.headers.append(
                "warning".parse().unwrap(),
                HeaderValue::from_static("111 - \"Revalidation failed\""),
            );
            ctx.status = Some(CacheStatus::CacheHit);
            return Ok((materialize(generated, entry), ctx.clone()));
        }

        ctx.status = Some(CacheStatus::Failure);
        Ok((local_response(StatusCode::GATEWAY_TIMEOUT, &self.config), ctx.clone()))
    }

    /// Applies `new` over the entry last read as `old`, retrying on CAS
    /// contention up to `cas_retry_limit` times before giving up silently
    /// (a storage write failure never surfaces to the caller, per §5/§7).
    async fn cas_update(&self, key: &StorageKey, old: &Arc<CacheEntry>, new: CacheEntry) {
        let mut current = old.clone();
        let mut candidate = new;
        for _ in 0..self.config.cas_retry_limit.max(1) {
            match self.storage.update(key, &current, candidate.clone()).await {
                Ok(Some(_)) => return,
                Ok(None) => match self.storage.get(key).await {
                    Ok(Some(fresh)) => {
                        candidate.generation = fresh.generation + 1;
                        current = fresh;
                    }
                    Ok(None) => return,
                    Err(err) => {
                        warn!("storage read failed during CAS retry for {key}: {err}");
                        return;
                    }
                },
                Err(err) => {
                    warn!("storage CAS update failed for {key}: {err}");
                    return;
                }
            }
        }
        warn!("storage CAS update exhausted retries for {key}");
    }

    async fn store_response(
        &self,
        primary_key: &StorageKey,
        request: &RawRequest,
        response: &RawResponse,
        request_time: std::time::SystemTime,
        response_time: std::time::SystemTime,
    ) -> Result<()> {
        if request.method == Method::HEAD {
            return self.reconcile_head_response(primary_key, request, response).await;
        }

        let body = self.resources.create(response.body.clone(), self.config.max_object_size)?;
        let vary_field_names = response
            .headers
            .get(&"vary".parse().unwrap())
            .and_then(|v| v.to_str().ok())
            .map(key::parse_vary)
            .unwrap_or_default();

        if vary_field_names.is_empty() {
            let leaf = CacheEntry::new_leaf(
                request.method.clone(),
                request.headers.clone(),
                request_time,
                response_time,
                response.status,
                None,
                response.headers.clone(),
                body,
            );
            self.storage.put(primary_key.clone(), leaf).await?;
            return Ok(());
        }

        let variant_key = key::variant_key(&vary_field_names, &request.headers);
        let variant_storage_key = primary_key.variant(&variant_key);

        let leaf = CacheEntry::new_leaf(
            request.method.clone(),
            request.headers.clone(),
            request_time,
            response_time,
            response.status,
            None,
            response.headers.clone(),
            body,
        );
        self.storage.put(variant_storage_key.clone(), leaf).await?;

        let parent = match self.storage.get(primary_key).await? {
            Some(existing) if existing.is_variant_parent() => (*existing).clone(),
            _ => CacheEntry::new_variant_parent(
                request.method.clone(),
                request.headers.clone(),
                request_time,
                response_time,
                response.status,
                None,
                response.headers.clone(),
            ),
        };
        let parent = parent.with_variant(variant_key, variant_storage_key);
        self.storage.put(primary_key.clone(), parent).await?;
        Ok(())
    }

    /// A `HEAD` response never creates or overwrites the `GET` leaf stored
    /// at the same key: it only checks that leaf still agrees with what the
    /// origin reports, via `EntryUpdater::reconcile_head`, and discards it
    /// on a mismatch so the next request revalidates instead of serving
    /// stale content as fresh.
    async fn reconcile_head_response(
        &self,
        primary_key: &StorageKey,
        request: &RawRequest,
        response: &RawResponse,
    ) -> Result<()> {
        if let Some((key, entry)) = self.resolve_for_head(primary_key, &request.headers).await {
            if EntryUpdater::reconcile_head(&entry, &response.headers) {
                self.storage.remove(&key).await?;
            }
        }
        Ok(())
    }

    /// Same variant resolution as `lookup`, but returning the concrete
    /// storage key alongside the entry so the caller can act on that exact
    /// key rather than the primary one.
    async fn resolve_for_head(
        &self,
        primary_key: &StorageKey,
        request_headers: &HeaderList,
    ) -> Option<(StorageKey, Arc<CacheEntry>)> {
        let entry = self.storage.get(primary_key).await.ok().flatten()?;
        if !entry.is_variant_parent() {
            return Some((primary_key.clone(), entry));
        }
        let field_names = entry.vary_field_names();
        if key::vary_is_star(&field_names) {
            return None;
        }
        let variant_key = key::variant_key(&field_names, request_headers);
        let storage_key = entry.variant_storage_key(&variant_key)?.clone();
        let variant = self.storage.get(&storage_key).await.ok().flatten()?;
        Some((storage_key, variant))
    }

    fn schedule_background_revalidation(&self, route: Route, request: RawRequest, key: StorageKey) {
        let storage = self.storage.clone();
        let resources = self.resources.clone();
        let backend = self.backend.clone();
        let clock = self.clock.clone();
        let config = self.config.clone();
        let revalidator_key = key.clone();

        self.revalidator.schedule(revalidator_key, move || async move {
            let executor = CachingExecutor { storage, resources, backend, clock, config, revalidator: Arc::new(AsynchronousRevalidator::new(&CacheConfig::default())) };
            let primary_key = key;
            let entry = executor
                .storage
                .get(&primary_key)
                .await?
                .ok_or_else(|| CacheError::CasContention(primary_key.clone()))?;
            let mut ctx = CallContext::new();
            let cancellation = CancellationToken::new();
            executor.revalidate(&route, &request, &primary_key, &entry, &cancellation, &mut ctx).await?;
            Ok(())
        });
    }
}

fn http_request_for(request: &RawRequest) -> http::Request<()> {
    let mut builder = http::Request::builder().method(request.method.clone()).uri("/");
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }
    builder.body(()).unwrap_or_else(|_| http::Request::new(()))
}

fn http_request_for_headerless(_entry: &CacheEntry) -> http::Request<()> {
    http::Request::builder().method(Method::GET).uri("/").body(()).unwrap()
}

fn materialize(generated: GeneratedResponse, entry: &CacheEntry) -> RawResponse {
    let body = if generated.include_body {
        entry.body().map(|b| b.bytes().to_vec()).unwrap_or_default()
    } else {
        Vec::new()
    };
    RawResponse { status: generated.status, headers: generated.headers, body }
}

fn local_response(status: StatusCode, config: &CacheConfig) -> RawResponse {
    let mut headers = HeaderList::new();
    if config.cache_status_headers {
        headers.append("x-cache".parse().unwrap(), HeaderValue::from_static("MISS"));
        headers.append("x-cache-lookup".parse().unwrap(), HeaderValue::from_static("MISS"));
    }
    RawResponse { status, headers, body: Vec::new() }
}

//! API route handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::{debug, info};

use dispas_core::constants::DEFAULT_PAGE_SIZE;
use dispas_core::traits::{AnnouncementLog, MetaAddressRegistry};
use dispas_core::types::{Announcement, DistributionReceipt, PublicKey, StealthMetaAddress, ViewingSecretKey};
use dispas_core::{Address, DispasError};
use dispas_crypto::generate_identity_keys;
use dispas_payout::StealthTransferReceipt;
use dispas_scanner::{ScanSummary, Scanner, ScannerConfig};
use dispas_stealth::{StealthPaymentBuilder, ViewOnlyKeys};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// POST /api/v1/keys/generate
pub async fn generate_keys() -> Result<Json<GenerateKeysResponse>> {
    let keys = generate_identity_keys()?;

    let response = GenerateKeysResponse {
        spending_pk: keys.spending.public.to_hex(),
        spending_sk: keys.spending.secret.to_hex().to_string(),
        viewing_pk: keys.viewing.public.to_hex(),
        viewing_sk: keys.viewing.secret.to_hex().to_string(),
        meta_address: keys.meta_address().to_uri(),
    };

    info!("Generated new identity keys");
    Ok(Json(response))
}

/// POST /api/v1/registry/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let meta = StealthMetaAddress::from_uri(&req.meta_address)?;

    let outcome = state
        .registry
        .register(req.caller, req.identity, meta)
        .await?;

    Ok(Json(RegisterResponse {
        identity: req.identity.address(),
        outcome,
    }))
}

/// GET /api/v1/registry/:identity
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<Address>,
) -> Result<Json<LookupResponse>> {
    let meta = state
        .registry
        .lookup(identity)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No meta-address registered for {}", identity)))?;

    Ok(Json(LookupResponse {
        identity,
        meta_address: meta.to_uri(),
        spending_pk: meta.spending.to_hex(),
        viewing_pk: meta.viewing.to_hex(),
    }))
}

/// POST /api/v1/stealth/create
pub async fn create_stealth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStealthRequest>,
) -> Result<Json<CreateStealthResponse>> {
    let meta = match (&req.meta_address, req.identity) {
        (Some(uri), None) => StealthMetaAddress::from_uri(uri)?,
        (None, Some(identity)) => state
            .registry
            .lookup(identity)
            .await?
            .ok_or(DispasError::RecipientNotRegistered(identity))?,
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of meta_address or identity is required",
            ))
        }
    };

    let mut builder = StealthPaymentBuilder::new().recipient(meta);
    if let Some(amount) = req.amount {
        builder = builder.native_amount(amount);
    }
    let payment = builder.build()?;

    let mut announcement = payment.announcement;
    let sequence = if req.publish {
        let sequence = state.log.append(announcement.clone()).await?;
        announcement.sequence = sequence;
        Some(sequence)
    } else {
        None
    };

    debug!(
        stealth_address = %payment.stealth.address,
        view_tag = payment.stealth.view_tag,
        "Created stealth payment"
    );

    Ok(Json(CreateStealthResponse {
        stealth_address: payment.stealth.address,
        ephemeral_public_key: payment.stealth.ephemeral_public_key.to_hex(),
        view_tag: payment.stealth.view_tag,
        announcement,
        sequence,
    }))
}

/// POST /api/v1/stealth/send
pub async fn send_stealth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StealthSendRequest>,
) -> Result<Json<StealthTransferReceipt>> {
    let metadata = req
        .metadata
        .as_deref()
        .map(|m| hex::decode(m.trim_start_matches("0x")))
        .transpose()?;

    let receipt = state
        .sender
        .send_stealth(req.caller, req.from, req.to, req.amount, metadata)
        .await?;

    Ok(Json(receipt))
}

/// POST /api/v1/stealth/scan
pub async fn scan_payments(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>> {
    let start = Instant::now();

    let viewing_secret = ViewingSecretKey::from_hex(&req.viewing_sk)?;
    let spending_public = PublicKey::from_hex(&req.spending_pk)?;

    let scanner = Scanner::with_config(
        ViewOnlyKeys::new(viewing_secret, spending_public),
        ScannerConfig::new().parallelism(state.config.scan_parallelism),
    );

    let from = req.from.unwrap_or(1);
    let to = match req.to {
        Some(to) => to,
        None => state.log.latest_sequence().await?.unwrap_or(0),
    };
    let found = scanner.scan_window(state.log.clone(), from, to).await?;

    let discoveries: Vec<DiscoveryDto> = found
        .into_iter()
        .map(|m| DiscoveryDto {
            stealth_address: m.stealth_address,
            sequence: m.announcement.sequence,
            timestamp: m.announcement.timestamp,
            amount: m.announcement.native_amount(),
        })
        .collect();

    let summary = ScanSummary::from(scanner.stats());
    let stats = ScanStatsDto {
        total_scanned: summary.total_scanned,
        view_tag_matches: summary.view_tag_matches,
        discoveries: summary.discoveries,
        duration_ms: start.elapsed().as_millis() as u64,
        rate: summary.rate,
    };

    info!(
        total_scanned = stats.total_scanned,
        discoveries = discoveries.len(),
        duration_ms = stats.duration_ms,
        "Scan complete"
    );

    Ok(Json(ScanResponse { discoveries, stats }))
}

/// POST /api/v1/announcements
pub async fn publish_announcement(
    State(state): State<Arc<AppState>>,
    Json(announcement): Json<Announcement>,
) -> Result<Json<PublishAnnouncementResponse>> {
    let view_tag = announcement.view_tag;
    let sequence = state.log.append(announcement).await?;

    info!(sequence, view_tag, "Published announcement");
    Ok(Json(PublishAnnouncementResponse { sequence }))
}

/// GET /api/v1/announcements?from&to
///
/// Returns at most one page; `next` tells where to continue.
pub async fn list_announcements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAnnouncementsQuery>,
) -> Result<Json<ListAnnouncementsResponse>> {
    let total = state.log.count().await?;
    let latest = state.log.latest_sequence().await?.unwrap_or(0);

    let from = params.from.unwrap_or(1).max(1);
    let requested_to = params.to.unwrap_or(latest).min(latest);
    let page_end = from.saturating_add(DEFAULT_PAGE_SIZE as u64 - 1);
    let to = requested_to.min(page_end);

    let announcements = state.log.query_window(from, to).await?;
    let next = (to < requested_to).then_some(to + 1);

    Ok(Json(ListAnnouncementsResponse {
        announcements,
        total,
        next,
    }))
}

/// POST /api/v1/distribute
pub async fn distribute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DistributeRequest>,
) -> Result<Json<DistributionReceipt>> {
    let receipt = state
        .engine
        .distribute(req.caller, req.payer, &req.payments, req.value, req.nonce.as_deref())
        .await?;

    Ok(Json(receipt))
}

/// GET /api/v1/balances/:account
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Path(account): Path<Address>,
) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        account,
        balance: state.ledger.balance(&account),
    })
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let count = state.log.count().await.unwrap_or(0);

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started.elapsed().as_secs(),
        announcements_count: count,
    })
}

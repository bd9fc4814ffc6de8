//! Inbound link routing.
//!
//! Two link shapes are recognized:
//! - custom scheme `ia-<company>://<shortCode>`, stored directly
//! - universal link `https://<link domain>/V1/<company>/<shortCode>`, looked
//!   up on the backend, which returns the code to store

use crate::attribution::StoreOutcome;
use crate::config::Generation;
use crate::context::SdkContext;
use crate::error::{SdkError, SdkResult};
use crate::logging::verbose;
use crate::resolver::LinkResolver;
use insert_affiliate_types::{DeepLinkPayload, ShortCode};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const CUSTOM_SCHEME_PREFIX: &str = "ia-";

/// A recognized inbound link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRoute {
    CustomScheme {
        company_code: String,
        short_code: ShortCode,
    },
    UniversalLink {
        company_code: String,
        short_code: ShortCode,
    },
}

impl LinkRoute {
    pub fn company_code(&self) -> &str {
        match self {
            Self::CustomScheme { company_code, .. } | Self::UniversalLink { company_code, .. } => {
                company_code
            }
        }
    }

    pub fn short_code(&self) -> &ShortCode {
        match self {
            Self::CustomScheme { short_code, .. } | Self::UniversalLink { short_code, .. } => {
                short_code
            }
        }
    }
}

/// Classify `url`. Returns `None` for anything that is not an Insert
/// Affiliate link or carries an invalid short code.
pub fn parse_link(url: &str, link_domain: &str) -> Option<LinkRoute> {
    let parsed = Url::parse(url.trim()).ok()?;

    if let Some(company) = parsed.scheme().strip_prefix(CUSTOM_SCHEME_PREFIX) {
        if company.is_empty() {
            return None;
        }
        let raw_code = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .or_else(|| first_segment(&parsed))?;
        return Some(LinkRoute::CustomScheme {
            company_code: company.to_string(),
            short_code: ShortCode::normalized(raw_code).ok()?,
        });
    }

    let is_link_domain = parsed
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(link_domain));
    if parsed.scheme() != "https" || !is_link_domain {
        return None;
    }
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    match segments.as_slice() {
        [version, company, code] if version.eq_ignore_ascii_case("v1") => {
            Some(LinkRoute::UniversalLink {
                company_code: company.to_string(),
                short_code: ShortCode::normalized(code).ok()?,
            })
        }
        _ => None,
    }
}

/// First non-empty path segment; the whole path for `scheme:code` forms.
fn first_segment(url: &Url) -> Option<&str> {
    if url.cannot_be_a_base() {
        return Some(url.path()).filter(|path| !path.is_empty());
    }
    url.path_segments()?.find(|segment| !segment.is_empty())
}

#[derive(Clone)]
pub struct DeepLinkRouter {
    ctx: Arc<SdkContext>,
    resolver: LinkResolver,
}

impl DeepLinkRouter {
    pub(crate) fn new(ctx: Arc<SdkContext>, resolver: LinkResolver) -> Self {
        Self { ctx, resolver }
    }

    /// Claim `url` if it is an Insert Affiliate link and process it in the
    /// background. Returns false when the link is not ours or links are
    /// disabled.
    pub fn handle_insert_links(&self, url: &str) -> bool {
        let Some((route, generation)) = self.claim(url) else {
            return false;
        };
        let router = self.clone();
        self.ctx.tasks.spawn(async move {
            if let Err(err) = router.dispatch(route, generation).await {
                log_dispatch_failure(&err);
            }
        })
    }

    /// Like [`DeepLinkRouter::handle_insert_links`], but waits for the
    /// result. `Ok(None)` means the link was not handled.
    pub async fn handle(&self, url: &str) -> SdkResult<Option<StoreOutcome>> {
        let Some((route, generation)) = self.claim(url) else {
            return Ok(None);
        };
        self.dispatch(route, generation).await.map(Some)
    }

    fn claim(&self, url: &str) -> Option<(LinkRoute, Generation)> {
        let snapshot = self.ctx.config.snapshot()?;
        if !snapshot.settings.links_enabled {
            debug!("insert links disabled; ignoring inbound link");
            return None;
        }
        let route = parse_link(url, &snapshot.settings.link_domain)?;
        if let Some(configured) = snapshot.company_code() {
            if !configured.eq_ignore_ascii_case(route.company_code()) {
                warn!(
                    link_company = route.company_code(),
                    configured_company = configured,
                    "link company does not match the configured company code"
                );
            }
        }
        verbose!(self.ctx, url, route = ?route, "handling insert link");
        Some((route, snapshot.generation))
    }

    async fn dispatch(&self, route: LinkRoute, generation: Generation) -> SdkResult<StoreOutcome> {
        match route {
            LinkRoute::CustomScheme { short_code, .. } => {
                self.resolver.commit(short_code.as_str(), generation).await
            }
            LinkRoute::UniversalLink {
                company_code,
                short_code,
            } => {
                let data = self
                    .ctx
                    .backend()?
                    .deep_link_data(&company_code, short_code.as_str())
                    .await?;
                let payload = DeepLinkPayload {
                    user_code: data.deep_link.user_code,
                    affiliate_email: data.deep_link.affiliate_email,
                    company_name: data.company.and_then(|c| c.company_name),
                };
                verbose!(
                    self.ctx,
                    link_code = %short_code,
                    user_code = %payload.user_code,
                    "universal link resolved"
                );
                let outcome = self.resolver.commit(&payload.user_code, generation).await?;
                self.ctx
                    .attribution
                    .set_deep_link_payload(payload, generation)
                    .await?;
                Ok(outcome)
            }
        }
    }
}

fn log_dispatch_failure(err: &SdkError) {
    match err {
        SdkError::Backend(e) if e.is_not_found() => {
            warn!(error = %e, "deep link not found; check the short code")
        }
        SdkError::Backend(e) if e.is_unauthorized() => {
            warn!(error = %e, "deep link lookup rejected; check the company code")
        }
        SdkError::Superseded => debug!("link result discarded after reset"),
        other => warn!(error = %other, "failed to handle insert link"),
    }
}

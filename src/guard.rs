//! Guard-view selection for gated pages.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages behind a subscription render exactly one of a loading placeholder, a
//! paywall, or their protected content. Auth and subscription status are
//! external signals; this module only decides which view applies.

/// Link target offered by the paywall.
pub const UPGRADE_PATH: &str = "/pricing";

/// External signals consumed by the guard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardSignals {
    pub auth_loading: bool,
    pub checking: bool,
    /// `None` until the subscription check has an answer.
    pub has_premium: Option<bool>,
    /// Identity of the signed-in user, if any.
    pub user: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    Paywall { upgrade_path: &'static str },
    Content,
}

/// Pick the view. Loading wins over the paywall check.
#[must_use]
pub fn resolve_guard(signals: &GuardSignals) -> GuardView {
    if signals.auth_loading || signals.checking || signals.has_premium.is_none() {
        return GuardView::Loading;
    }
    if signals.user.is_none() || signals.has_premium == Some(false) {
        return GuardView::Paywall { upgrade_path: UPGRADE_PATH };
    }
    GuardView::Content
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

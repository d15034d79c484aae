//! Which windows the picker lists. Everything here is a pure function of the
//! registries and the preferences.

use super::{Application, SpaceId, SpaceRegistry, Window, WindowRegistry};
use crate::config::{BlacklistMode, Filters, ScreensToShow, SpacesToShow};
use crate::monitor::Screen;

pub struct EligibilityContext<'a> {
    pub current_space: Option<SpaceId>,
    pub screen: &'a Screen,
    pub filters: &'a Filters,
}

pub fn should_show_the_user(
    window: &Window,
    app: Option<&Application>,
    cx: &EligibilityContext<'_>,
) -> bool {
    let Some(frame) = window.frame else {
        return false;
    };
    let app_name = app.map(|a| a.name.as_str()).unwrap_or_default();
    match cx.filters.blacklist_mode(app_name) {
        Some(BlacklistMode::Always) => return false,
        Some(BlacklistMode::WhenNoTitle) if window.title.trim().is_empty() => return false,
        _ => {}
    }
    if window.is_minimized && !cx.filters.show_minimized {
        return false;
    }
    if window.is_hidden && !cx.filters.show_hidden {
        return false;
    }
    if cx.filters.spaces_to_show == SpacesToShow::Current && !is_on_current_space(window, cx) {
        return false;
    }
    if cx.filters.screens_to_show == ScreensToShow::ShowingPicker
        && !window.is_minimized
        && cx.screen.frame.intersection_area(&frame) <= 0.0
    {
        return false;
    }
    true
}

/// Unknown membership counts as "here": better to over-show than to hide a
/// window because of a flaky space query.
fn is_on_current_space(window: &Window, cx: &EligibilityContext<'_>) -> bool {
    if window.is_on_all_spaces {
        return true;
    }
    match (cx.current_space, window.space_id) {
        (Some(current), Some(space)) => current == space,
        _ => true,
    }
}

pub fn refresh_which_windows_to_show_the_user(
    registry: &mut WindowRegistry,
    spaces: &SpaceRegistry,
    screen: &Screen,
    filters: &Filters,
) {
    let cx = EligibilityContext {
        current_space: spaces.current_space_id(),
        screen,
        filters,
    };
    let verdicts: Vec<bool> = registry
        .list()
        .iter()
        .map(|w| should_show_the_user(w, registry.app_of(w), &cx))
        .collect();
    for (window, verdict) in registry.windows_mut().zip(verdicts) {
        window.should_show_the_user = verdict;
    }
}

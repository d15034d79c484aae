//! Refresh of an open picker: four ordered steps, each one skipped once a
//! hide has cancelled the UI work.

use super::App;
use crate::discovery::Discovery;
use crate::layout::{self, show_space_labels, thumbnail_max_size, LayoutInput};
use crate::model::{Rect, WindowId};
use crate::picker::{PanelItem, PanelView};
use crate::platform::WindowServer;
use crate::selection::SummonState;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ReconcileSpace,
    Layout,
    Resize,
    Reposition,
}

impl Step {
    const ALL: [Step; 4] = [Step::ReconcileSpace, Step::Layout, Step::Resize, Step::Reposition];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The picker is not in use.
    Skipped,
    Cancelled { before: Step },
    Completed,
}

impl<S: WindowServer, P: PanelView> App<S, P> {
    /// Re-capture `changed` windows, then reconcile the space, lay out,
    /// resize and reposition the panel.
    pub fn refresh_open_ui(&mut self, changed: &[WindowId]) -> RefreshOutcome {
        if !self.session.app_is_being_used() || self.selection.state() != SummonState::Active {
            return RefreshOutcome::Skipped;
        }
        let Some(screen) = self.screen.clone() else {
            return RefreshOutcome::Skipped;
        };

        if !changed.is_empty() {
            let max = thumbnail_max_size(&screen, &self.prefs.appearance);
            let mut discovery = Discovery::new(&self.server, &mut self.windows, &mut self.spaces);
            for &id in changed {
                discovery.refresh_thumbnail(id, max);
            }
        }

        for step in Step::ALL {
            if !self.session.ui_work_should_be_done() {
                debug!(target: "alt_tab::refresh", ?step, "ui work cancelled");
                return RefreshOutcome::Cancelled { before: step };
            }
            trace!(target: "alt_tab::refresh", ?step, "step");
            match step {
                Step::ReconcileSpace => self.spaces.refresh_current_space_id(&self.server),
                Step::Layout => {
                    let labels = show_space_labels(&self.prefs.appearance, &self.spaces);
                    let inputs: Vec<LayoutInput> = self
                        .windows
                        .eligible()
                        .map(|w| LayoutInput {
                            window_id: w.id,
                            aspect: w.frame.and_then(|f| f.size.aspect_ratio()),
                            space_label: if labels && !w.is_on_all_spaces {
                                w.space_index
                            } else {
                                None
                            },
                        })
                        .collect();
                    self.layout = layout::compute(&inputs, &screen, &self.prefs.appearance);
                    let items = self.panel_items();
                    self.panel.update_items(&screen, items, self.layout.size);
                }
                Step::Resize => {
                    let origin = self.panel.frame().origin;
                    self.panel.set_frame(Rect::new(origin, self.layout.size));
                }
                Step::Reposition => {
                    self.panel
                        .set_frame(screen.frame.centered_child(self.layout.size));
                }
            }
        }
        RefreshOutcome::Completed
    }

    fn panel_items(&self) -> Vec<PanelItem> {
        self.layout
            .items
            .iter()
            .filter_map(|item| {
                let window = self.windows.get(item.window_id)?;
                let app = self.windows.app_of(window);
                Some(PanelItem {
                    window_id: window.id,
                    title: window.display_title(app).to_string(),
                    app_name: app.map(|a| a.name.clone()).unwrap_or_default(),
                    space_label: item.space_label,
                    frame: item.frame,
                    thumbnail: window.thumbnail.clone(),
                    icon: app.and_then(|a| a.icon.clone()),
                })
            })
            .collect()
    }
}

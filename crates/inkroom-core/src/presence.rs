//! Ephemeral per-connection presence and the projections the UI draws from it.

use crate::geometry::Point;
use crate::layer::{Color, LayerId, PenPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Room-assigned identifier of one connection.
pub type ConnectionId = u32;

/// Colors handed out to connections, indexed by connection id.
pub const PRESENCE_PALETTE: [Color; 20] = [
    Color::new(255, 87, 51),
    Color::new(51, 255, 87),
    Color::new(51, 87, 255),
    Color::new(255, 99, 71),
    Color::new(60, 179, 113),
    Color::new(123, 104, 238),
    Color::new(255, 0, 0),
    Color::new(0, 204, 0),
    Color::new(51, 51, 255),
    Color::new(255, 191, 0),
    Color::new(255, 165, 0),
    Color::new(64, 224, 208),
    Color::new(218, 165, 32),
    Color::new(0, 128, 128),
    Color::new(75, 0, 130),
    Color::new(250, 128, 114),
    Color::new(220, 20, 60),
    Color::new(210, 105, 30),
    Color::new(106, 90, 205),
    Color::new(199, 21, 133),
];

/// Stable color for a connection.
pub fn connection_id_to_color(connection_id: ConnectionId) -> Color {
    PRESENCE_PALETTE[connection_id as usize % PRESENCE_PALETTE.len()]
}

/// What a connection is currently doing. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    #[serde(default)]
    pub cursor: Option<Point>,
    #[serde(default)]
    pub selection: Vec<LayerId>,
    #[serde(default)]
    pub pencil_draft: Option<Vec<PenPoint>>,
    #[serde(default)]
    pub pen_color: Option<Color>,
}

impl Presence {
    /// Apply an update and return the update that restores the previous values.
    pub fn apply(&mut self, update: PresenceUpdate) -> PresenceUpdate {
        let mut inverse = PresenceUpdate::default();
        if let Some(cursor) = update.cursor {
            inverse.cursor = Some(std::mem::replace(&mut self.cursor, cursor));
        }
        if let Some(selection) = update.selection {
            inverse.selection = Some(std::mem::replace(&mut self.selection, selection));
        }
        if let Some(draft) = update.pencil_draft {
            inverse.pencil_draft = Some(std::mem::replace(&mut self.pencil_draft, draft));
        }
        if let Some(color) = update.pen_color {
            inverse.pen_color = Some(std::mem::replace(&mut self.pen_color, color));
        }
        inverse
    }

    pub fn is_selected(&self, id: &LayerId) -> bool {
        self.selection.contains(id)
    }
}

/// Partial presence write. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Option<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Vec<LayerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pencil_draft: Option<Option<Vec<PenPoint>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pen_color: Option<Option<Color>>,
}

impl PresenceUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(mut self, cursor: Option<Point>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_selection(mut self, selection: Vec<LayerId>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_pencil_draft(mut self, draft: Option<Vec<PenPoint>>) -> Self {
        self.pencil_draft = Some(draft);
        self
    }

    pub fn with_pen_color(mut self, color: Option<Color>) -> Self {
        self.pen_color = Some(color);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_none()
            && self.selection.is_none()
            && self.pencil_draft.is_none()
            && self.pen_color.is_none()
    }
}

/// Map each layer selected by another connection to that connection's color.
///
/// When several connections select the same layer the lowest connection id wins.
pub fn layer_selection_colors(others: &[(ConnectionId, Presence)]) -> HashMap<LayerId, Color> {
    let mut sorted: Vec<&(ConnectionId, Presence)> = others.iter().collect();
    sorted.sort_by_key(|(id, _)| *id);

    let mut colors = HashMap::new();
    for (connection_id, presence) in sorted {
        let color = connection_id_to_color(*connection_id);
        for layer_id in &presence.selection {
            colors.entry(layer_id.clone()).or_insert(color);
        }
    }
    colors
}

/// A stroke another connection is drawing right now.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDraft<'a> {
    pub connection_id: ConnectionId,
    pub points: &'a [PenPoint],
    /// The sender's pen color, black when unset.
    pub color: Color,
}

/// In-progress strokes of other connections, ordered by connection id.
pub fn remote_drafts(others: &[(ConnectionId, Presence)]) -> Vec<RemoteDraft<'_>> {
    let mut drafts: Vec<RemoteDraft<'_>> = others
        .iter()
        .filter_map(|(connection_id, presence)| {
            let points = presence.pencil_draft.as_deref()?;
            Some(RemoteDraft {
                connection_id: *connection_id,
                points,
                color: presence.pen_color.unwrap_or(Color::BLACK),
            })
        })
        .collect();
    drafts.sort_by_key(|draft| draft.connection_id);
    drafts
}

/// Cursor positions of other connections with their presence colors.
pub fn remote_cursors(others: &[(ConnectionId, Presence)]) -> Vec<(ConnectionId, Point, Color)> {
    let mut cursors: Vec<_> = others
        .iter()
        .filter_map(|(id, presence)| presence.cursor.map(|c| (*id, c, connection_id_to_color(*id))))
        .collect();
    cursors.sort_by_key(|(id, _, _)| *id);
    cursors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selecting(ids: &[&str]) -> Presence {
        Presence {
            selection: ids.iter().map(|id| LayerId::from(*id)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_connection_colors_wrap() {
        assert_eq!(connection_id_to_color(0), Color::new(255, 87, 51));
        assert_eq!(connection_id_to_color(6), Color::new(255, 0, 0));
        assert_eq!(connection_id_to_color(20), connection_id_to_color(0));
        assert_eq!(connection_id_to_color(43), connection_id_to_color(3));
    }

    #[test]
    fn test_selection_colors_lowest_id_wins() {
        let others = vec![
            (7, selecting(&["shared", "seven"])),
            (2, selecting(&["shared"])),
        ];
        let colors = layer_selection_colors(&others);
        assert_eq!(colors[&LayerId::from("shared")], connection_id_to_color(2));
        assert_eq!(colors[&LayerId::from("seven")], connection_id_to_color(7));
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_remote_drafts_default_to_black() {
        let drawing = Presence {
            pencil_draft: Some(vec![PenPoint::new(1.0, 2.0, 0.5)]),
            ..Default::default()
        };
        let colored = Presence {
            pencil_draft: Some(vec![PenPoint::new(3.0, 4.0, 0.5)]),
            pen_color: Some(Color::new(0, 0, 255)),
            ..Default::default()
        };
        let others = vec![(5, colored), (1, drawing), (3, Presence::default())];

        let drafts = remote_drafts(&others);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].connection_id, 1);
        assert_eq!(drafts[0].color, Color::BLACK);
        assert_eq!(drafts[1].color, Color::new(0, 0, 255));
    }

    #[test]
    fn test_apply_returns_inverse() {
        let mut presence = selecting(&["a"]);
        let inverse = presence.apply(
            PresenceUpdate::new()
                .with_selection(vec![LayerId::from("b")])
                .with_cursor(Some(Point::new(1, 1))),
        );
        assert_eq!(presence.selection, vec![LayerId::from("b")]);
        assert_eq!(inverse.selection, Some(vec![LayerId::from("a")]));
        assert_eq!(inverse.cursor, Some(None));
        assert!(inverse.pencil_draft.is_none());

        presence.apply(inverse);
        assert_eq!(presence, selecting(&["a"]));
    }
}

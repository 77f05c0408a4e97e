//! Conversion between layers and Loro map entries.

use crate::layer::{Color, Layer, LayerKind, PenPoint};
use loro::{LoroList, LoroMap, LoroMapValue, LoroResult, LoroValue};

const TYPE_RECTANGLE: &str = "rectangle";
const TYPE_ELLIPSE: &str = "ellipse";
const TYPE_TEXT: &str = "text";
const TYPE_NOTE: &str = "note";
const TYPE_PATH: &str = "path";

const KEY_TYPE: &str = "type";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_FILL_R: &str = "fill_r";
const KEY_FILL_G: &str = "fill_g";
const KEY_FILL_B: &str = "fill_b";
const KEY_VALUE: &str = "value";
const KEY_POINTS: &str = "points";
const KEY_HAS_STROKE: &str = "has_stroke";
const KEY_STROKE_R: &str = "stroke_r";
const KEY_STROKE_G: &str = "stroke_g";
const KEY_STROKE_B: &str = "stroke_b";

fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    as_double(map.get(key)?)
}

fn as_double(value: &LoroValue) -> Option<f64> {
    match value {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_channel(map: &LoroMapValue, key: &str) -> Option<u8> {
    match map.get(key)? {
        LoroValue::I64(i) => u8::try_from(*i).ok(),
        LoroValue::Double(d) => Some(d.clamp(0.0, 255.0) as u8),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn get_bool(map: &LoroMapValue, key: &str) -> Option<bool> {
    match map.get(key)? {
        LoroValue::Bool(b) => Some(*b),
        _ => None,
    }
}

fn color_to_loro(color: Color, keys: [&str; 3], map: &LoroMap) -> LoroResult<()> {
    map.insert(keys[0], i64::from(color.r))?;
    map.insert(keys[1], i64::from(color.g))?;
    map.insert(keys[2], i64::from(color.b))?;
    Ok(())
}

fn color_from_loro(map: &LoroMapValue, keys: [&str; 3]) -> Option<Color> {
    Some(Color::new(
        get_channel(map, keys[0])?,
        get_channel(map, keys[1])?,
        get_channel(map, keys[2])?,
    ))
}

/// Write a layer into an empty Loro map.
pub fn layer_to_loro(layer: &Layer, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_X, layer.x)?;
    map.insert(KEY_Y, layer.y)?;
    map.insert(KEY_WIDTH, layer.width)?;
    map.insert(KEY_HEIGHT, layer.height)?;
    color_to_loro(layer.fill, [KEY_FILL_R, KEY_FILL_G, KEY_FILL_B], map)?;

    match &layer.kind {
        LayerKind::Rectangle => map.insert(KEY_TYPE, TYPE_RECTANGLE)?,
        LayerKind::Ellipse => map.insert(KEY_TYPE, TYPE_ELLIPSE)?,
        LayerKind::Text { value } | LayerKind::Note { value } => {
            let kind = if matches!(layer.kind, LayerKind::Text { .. }) { TYPE_TEXT } else { TYPE_NOTE };
            map.insert(KEY_TYPE, kind)?;
            if let Some(value) = value {
                map.insert(KEY_VALUE, value.as_str())?;
            }
        }
        LayerKind::Path { points, stroke } => {
            map.insert(KEY_TYPE, TYPE_PATH)?;
            // Each sample is stored as an [x, y, pressure] list
            let points_list = map.insert_container(KEY_POINTS, LoroList::new())?;
            for point in points {
                let sample = points_list.insert_container(points_list.len(), LoroList::new())?;
                sample.push(point.x)?;
                sample.push(point.y)?;
                sample.push(point.pressure)?;
            }
            map.insert(KEY_HAS_STROKE, stroke.is_some())?;
            if let Some(stroke) = stroke {
                color_to_loro(*stroke, [KEY_STROKE_R, KEY_STROKE_G, KEY_STROKE_B], map)?;
            }
        }
    }
    Ok(())
}

/// Read a layer back from the deep value of its Loro map.
pub fn layer_from_loro(map: &LoroMapValue) -> Option<Layer> {
    let kind = match get_string(map, KEY_TYPE)?.as_str() {
        TYPE_RECTANGLE => LayerKind::Rectangle,
        TYPE_ELLIPSE => LayerKind::Ellipse,
        TYPE_TEXT => LayerKind::Text {
            value: get_string(map, KEY_VALUE),
        },
        TYPE_NOTE => LayerKind::Note {
            value: get_string(map, KEY_VALUE),
        },
        TYPE_PATH => LayerKind::Path {
            points: points_from_loro(map),
            stroke: if get_bool(map, KEY_HAS_STROKE).unwrap_or(false) {
                color_from_loro(map, [KEY_STROKE_R, KEY_STROKE_G, KEY_STROKE_B])
            } else {
                None
            },
        },
        other => {
            log::warn!("Unknown layer type in document: {other}");
            return None;
        }
    };

    Some(Layer {
        x: get_double(map, KEY_X)?,
        y: get_double(map, KEY_Y)?,
        width: get_double(map, KEY_WIDTH)?,
        height: get_double(map, KEY_HEIGHT)?,
        fill: color_from_loro(map, [KEY_FILL_R, KEY_FILL_G, KEY_FILL_B])?,
        kind,
    })
}

fn points_from_loro(map: &LoroMapValue) -> Vec<PenPoint> {
    let Some(LoroValue::List(points_list)) = map.get(KEY_POINTS) else {
        return Vec::new();
    };
    points_list
        .iter()
        .filter_map(|sample| {
            let LoroValue::List(values) = sample else {
                return None;
            };
            let x = as_double(values.first()?)?;
            let y = as_double(values.get(1)?)?;
            let pressure = values.get(2).and_then(as_double).unwrap_or(0.5);
            Some(PenPoint::new(x, y, pressure))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::XYWH;
    use crate::layer::LayerType;
    use loro::LoroDoc;

    fn round_trip(layer: &Layer) -> Option<Layer> {
        let doc = LoroDoc::new();
        let layers = doc.get_map("layers");
        let map = layers.insert_container("id", LoroMap::new()).unwrap();
        layer_to_loro(layer, &map).unwrap();
        doc.commit();

        match map.get_deep_value() {
            LoroValue::Map(value) => layer_from_loro(&value),
            _ => None,
        }
    }

    #[test]
    fn test_note_with_value() {
        let mut note = Layer::new(LayerType::Note, XYWH::new(1.0, 2.0, 30.0, 40.0), Color::new(9, 8, 7));
        note.kind = LayerKind::Note {
            value: Some("todo".into()),
        };
        assert_eq!(round_trip(&note), Some(note));
    }

    #[test]
    fn test_path_keeps_pressure() {
        let draft = [PenPoint::new(0.0, 0.0, 0.2), PenPoint::new(10.0, 5.0, 0.9)];
        let path = Layer::from_pen_points(&draft, Color::BLACK).unwrap();
        let recovered = round_trip(&path).unwrap();
        assert_eq!(recovered.points(), path.points());
        assert_eq!(recovered.layer_type(), LayerType::Path);
    }
}

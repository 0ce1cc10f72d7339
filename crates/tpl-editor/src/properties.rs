//! Property editor: typed view and edits of the selected element.
//!
//! Hosts read a panel of the selected element's attributes and write one
//! field at a time. Every successful write is one `update_element` call,
//! so each change is its own undo step.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tpl_core::model::{Attr, Color, Element, ElementKind};
use tpl_core::{ElementId, SceneStore, ZOrder};

/// Every attribute the property panel can show or edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyField {
    X,
    Y,
    Width,
    Height,
    Rotation,
    Opacity,
    ZIndex,
    Content,
    TextColor,
    FontFamily,
    FontSize,
    FontWeight,
    Italic,
    Underline,
    Align,
    Shape,
    Fill,
    CornerRadius,
    StrokeColor,
    StrokeWidth,
    Src,
    Blur,
    Brightness,
    Contrast,
}

const COMMON: &[PropertyField] = &[
    PropertyField::X,
    PropertyField::Y,
    PropertyField::Width,
    PropertyField::Height,
    PropertyField::Rotation,
    PropertyField::Opacity,
    PropertyField::ZIndex,
];

impl PropertyField {
    pub const ALL: &[PropertyField] = &[
        Self::X,
        Self::Y,
        Self::Width,
        Self::Height,
        Self::Rotation,
        Self::Opacity,
        Self::ZIndex,
        Self::Content,
        Self::TextColor,
        Self::FontFamily,
        Self::FontSize,
        Self::FontWeight,
        Self::Italic,
        Self::Underline,
        Self::Align,
        Self::Shape,
        Self::Fill,
        Self::CornerRadius,
        Self::StrokeColor,
        Self::StrokeWidth,
        Self::Src,
        Self::Blur,
        Self::Brightness,
        Self::Contrast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Width => "width",
            Self::Height => "height",
            Self::Rotation => "rotation",
            Self::Opacity => "opacity",
            Self::ZIndex => "zIndex",
            Self::Content => "content",
            Self::TextColor => "textColor",
            Self::FontFamily => "fontFamily",
            Self::FontSize => "fontSize",
            Self::FontWeight => "fontWeight",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Align => "align",
            Self::Shape => "shape",
            Self::Fill => "fill",
            Self::CornerRadius => "cornerRadius",
            Self::StrokeColor => "strokeColor",
            Self::StrokeWidth => "strokeWidth",
            Self::Src => "src",
            Self::Blur => "blur",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// A property value as it crosses the host boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f32),
    Text(String),
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Color> for PropertyValue {
    fn from(c: Color) -> Self {
        Self::Text(c.to_hex())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PropertyError {
    #[error("no element is selected")]
    NoSelection,
    #[error("`{field}` does not apply to {kind} elements")]
    NotApplicable { field: &'static str, kind: &'static str },
    #[error("`{field}` expects {expected}")]
    WrongType { field: &'static str, expected: &'static str },
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Fields shown for an element kind: the common box attributes followed by
/// the kind-specific ones.
pub fn fields_for(kind: &ElementKind) -> Vec<PropertyField> {
    use PropertyField::*;
    let specific: &[PropertyField] = match kind {
        ElementKind::Text(_) => &[Content, TextColor, FontFamily, FontSize, FontWeight, Italic, Underline, Align],
        ElementKind::Image(_) => &[Src, Blur, Brightness, Contrast],
        ElementKind::Shape(_) => &[Shape, Fill, CornerRadius],
        ElementKind::Line(_) | ElementKind::Arrow(_) | ElementKind::Freehand(_) => &[StrokeColor, StrokeWidth],
    };
    COMMON.iter().chain(specific).copied().collect()
}

/// Current value of `field`, or `None` if it does not apply to the element.
pub fn read(element: &Element, field: PropertyField) -> Option<PropertyValue> {
    use PropertyField as F;
    let value = match (field, &element.kind) {
        (F::X, _) => element.x.into(),
        (F::Y, _) => element.y.into(),
        (F::Width, _) => element.width.into(),
        (F::Height, _) => element.height.into(),
        (F::Rotation, _) => element.rotation.into(),
        (F::Opacity, _) => element.opacity.into(),
        (F::ZIndex, _) => PropertyValue::Number(element.z_index as f32),

        (F::Content, ElementKind::Text(t)) => t.content.clone().into(),
        (F::TextColor, ElementKind::Text(t)) => t.color.into(),
        (F::FontFamily, ElementKind::Text(t)) => t.font_family.clone().into(),
        (F::FontSize, ElementKind::Text(t)) => t.font_size.into(),
        (F::FontWeight, ElementKind::Text(t)) => keyword(&t.weight)?,
        (F::Italic, ElementKind::Text(t)) => t.italic.into(),
        (F::Underline, ElementKind::Text(t)) => t.underline.into(),
        (F::Align, ElementKind::Text(t)) => keyword(&t.align)?,

        (F::Shape, ElementKind::Shape(s)) => keyword(&s.shape)?,
        (F::Fill, ElementKind::Shape(s)) => s.fill.into(),
        (F::CornerRadius, ElementKind::Shape(s)) => s.corner_radius.into(),

        (F::StrokeColor, ElementKind::Line(s) | ElementKind::Arrow(s)) => s.color.into(),
        (F::StrokeWidth, ElementKind::Line(s) | ElementKind::Arrow(s)) => s.width.into(),
        (F::StrokeColor, ElementKind::Freehand(f)) => f.color.into(),
        (F::StrokeWidth, ElementKind::Freehand(f)) => f.width.into(),

        (F::Src, ElementKind::Image(i)) => i.src.clone().into(),
        (F::Blur, ElementKind::Image(i)) => i.filters.blur.into(),
        (F::Brightness, ElementKind::Image(i)) => i.filters.brightness.into(),
        (F::Contrast, ElementKind::Image(i)) => i.filters.contrast.into(),

        _ => return None,
    };
    Some(value)
}

fn keyword<T: Serialize>(value: &T) -> Option<PropertyValue> {
    match serde_json::to_value(value).ok()? {
        serde_json::Value::String(s) => Some(PropertyValue::Text(s)),
        _ => None,
    }
}

/// Convert a host value into the attribute edit for `field`.
pub fn to_attr(field: PropertyField, value: &PropertyValue) -> Result<Attr, PropertyError> {
    use PropertyField as F;
    let name = field.name();
    let attr = match field {
        F::X => Attr::X(number(name, value)?),
        F::Y => Attr::Y(number(name, value)?),
        F::Width => Attr::Width(number(name, value)?),
        F::Height => Attr::Height(number(name, value)?),
        F::Rotation => Attr::Rotation(number(name, value)?),
        F::Opacity => Attr::Opacity(number(name, value)?),
        F::ZIndex => {
            let z = number(name, value)?;
            if z < 0.0 {
                return Err(PropertyError::InvalidValue {
                    field: name,
                    reason: "z-index cannot be negative".into(),
                });
            }
            Attr::ZIndex(z.round() as u32)
        }
        F::Content => Attr::Content(text(name, value)?.to_string()),
        F::TextColor => Attr::TextColor(color(name, value)?),
        F::FontFamily => Attr::FontFamily(text(name, value)?.to_string()),
        F::FontSize => Attr::FontSize(number(name, value)?),
        F::FontWeight => Attr::FontWeight(parse_keyword(name, value)?),
        F::Italic => Attr::Italic(boolean(name, value)?),
        F::Underline => Attr::Underline(boolean(name, value)?),
        F::Align => Attr::Align(parse_keyword(name, value)?),
        F::Shape => Attr::Shape(parse_keyword(name, value)?),
        F::Fill => Attr::Fill(color(name, value)?),
        F::CornerRadius => Attr::CornerRadius(number(name, value)?),
        F::StrokeColor => Attr::StrokeColor(color(name, value)?),
        F::StrokeWidth => Attr::StrokeWidth(number(name, value)?),
        F::Src => Attr::Src(text(name, value)?.to_string()),
        F::Blur => Attr::Blur(number(name, value)?),
        F::Brightness => Attr::Brightness(number(name, value)?),
        F::Contrast => Attr::Contrast(number(name, value)?),
    };
    Ok(attr)
}

/// Numbers arrive either as JSON numbers or as the string contents of an
/// input box.
fn number(field: &'static str, value: &PropertyValue) -> Result<f32, PropertyError> {
    let n = match value {
        PropertyValue::Number(n) => *n,
        PropertyValue::Text(s) => s.trim().parse::<f32>().map_err(|_| PropertyError::WrongType {
            field,
            expected: "a number",
        })?,
        PropertyValue::Bool(_) => {
            return Err(PropertyError::WrongType {
                field,
                expected: "a number",
            });
        }
    };
    if n.is_finite() {
        Ok(n)
    } else {
        Err(PropertyError::InvalidValue {
            field,
            reason: "must be finite".into(),
        })
    }
}

fn text<'a>(field: &'static str, value: &'a PropertyValue) -> Result<&'a str, PropertyError> {
    match value {
        PropertyValue::Text(s) => Ok(s),
        _ => Err(PropertyError::WrongType {
            field,
            expected: "text",
        }),
    }
}

fn boolean(field: &'static str, value: &PropertyValue) -> Result<bool, PropertyError> {
    match value {
        PropertyValue::Bool(b) => Ok(*b),
        PropertyValue::Text(s) if s == "true" => Ok(true),
        PropertyValue::Text(s) if s == "false" => Ok(false),
        _ => Err(PropertyError::WrongType {
            field,
            expected: "true or false",
        }),
    }
}

fn color(field: &'static str, value: &PropertyValue) -> Result<Color, PropertyError> {
    let s = text(field, value)?;
    Color::from_hex(s).ok_or_else(|| PropertyError::InvalidValue {
        field,
        reason: format!("`{s}` is not a hex color"),
    })
}

fn parse_keyword<T: DeserializeOwned>(field: &'static str, value: &PropertyValue) -> Result<T, PropertyError> {
    let s = text(field, value)?;
    serde_json::from_value(serde_json::Value::String(s.to_lowercase())).map_err(|_| PropertyError::InvalidValue {
        field,
        reason: format!("unknown option `{s}`"),
    })
}

/// Writes property edits and layer actions against the store's selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyEditor;

impl PropertyEditor {
    pub fn new() -> Self {
        Self
    }

    /// Set one field on the selected element. Returns whether the element
    /// changed; an equal value is accepted but commits nothing.
    pub fn set(&self, store: &mut SceneStore, field: PropertyField, value: &PropertyValue) -> Result<bool, PropertyError> {
        let element = store.selected_element().ok_or(PropertyError::NoSelection)?;
        let id = element.id;
        if !fields_for(&element.kind).contains(&field) {
            return Err(PropertyError::NotApplicable {
                field: field.name(),
                kind: element.kind.name(),
            });
        }
        let attr = to_attr(field, value)?;
        let changed = store.update_element(id, &[attr]);
        if changed {
            log::debug!("set {} on {id}", field.name());
        }
        Ok(changed)
    }

    /// Panel contents for the selected element as a JSON object:
    /// `id`, `type` and every applicable field. `{}` when nothing is
    /// selected.
    pub fn panel(&self, store: &SceneStore) -> serde_json::Value {
        let mut props = serde_json::Map::new();
        let Some(element) = store.selected_element() else {
            return serde_json::Value::Object(props);
        };
        props.insert("id".into(), serde_json::json!(element.id));
        props.insert("type".into(), element.kind.name().into());
        for field in fields_for(&element.kind) {
            if let Some(value) = read(element, field) {
                props.insert(field.name().into(), serde_json::json!(value));
            }
        }
        serde_json::Value::Object(props)
    }

    pub fn bring_forward(&self, store: &mut SceneStore) -> Result<bool, PropertyError> {
        let id = selected(store)?;
        Ok(store.reorder(id, ZOrder::Up))
    }

    pub fn send_backward(&self, store: &mut SceneStore) -> Result<bool, PropertyError> {
        let id = selected(store)?;
        Ok(store.reorder(id, ZOrder::Down))
    }

    /// Duplicate the selected element and select the copy.
    pub fn duplicate(&self, store: &mut SceneStore) -> Result<ElementId, PropertyError> {
        let id = selected(store)?;
        let copy = store.duplicate_element(id).ok_or(PropertyError::NoSelection)?;
        store.set_selection(Some(copy));
        Ok(copy)
    }

    pub fn delete(&self, store: &mut SceneStore) -> Result<bool, PropertyError> {
        let id = selected(store)?;
        Ok(store.delete_element(id))
    }
}

fn selected(store: &SceneStore) -> Result<ElementId, PropertyError> {
    store.selection().primary().ok_or(PropertyError::NoSelection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tpl_core::model::{FontWeight, ShapeKind};
    use tpl_core::{EditorConfig, ElementSpec};

    fn store_with(spec: ElementSpec) -> (SceneStore, ElementId) {
        let mut store = SceneStore::new(&EditorConfig::default());
        let id = store.add_element(spec);
        store.set_selection(Some(id));
        (store, id)
    }

    #[test]
    fn field_names_round_trip() {
        for &field in PropertyField::ALL {
            assert_eq!(PropertyField::from_name(field.name()), Some(field));
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.name()));
        }
        assert_eq!(PropertyField::from_name("selected"), None);
    }

    #[test]
    fn fields_depend_on_kind() {
        let text = ElementSpec::text("hi", 0.0, 0.0).kind;
        let fields = fields_for(&text);
        assert!(fields.contains(&PropertyField::FontSize));
        assert!(!fields.contains(&PropertyField::Fill));
        let line = ElementSpec::line(0.0, 0.0, 10.0).kind;
        assert_eq!(&fields_for(&line)[7..], &[PropertyField::StrokeColor, PropertyField::StrokeWidth]);
    }

    #[test]
    fn set_fill_commits_one_step() {
        let (mut store, id) = store_with(ElementSpec::shape(ShapeKind::Circle, 0.0, 0.0));
        let before = store.history().len();
        let editor = PropertyEditor::new();
        assert_eq!(editor.set(&mut store, PropertyField::Fill, &"#ff0000".into()), Ok(true));
        assert_eq!(store.history().len(), before + 1);
        assert_eq!(read(store.get(id).unwrap(), PropertyField::Fill), Some("#FF0000".into()));
        // Same value again: accepted, nothing committed.
        assert_eq!(editor.set(&mut store, PropertyField::Fill, &"#FF0000".into()), Ok(false));
        assert_eq!(store.history().len(), before + 1);
    }

    #[test]
    fn numbers_accept_input_box_strings() {
        let (mut store, id) = store_with(ElementSpec::text("hi", 0.0, 0.0));
        let editor = PropertyEditor::new();
        editor.set(&mut store, PropertyField::FontSize, &" 36 ".into()).unwrap();
        editor.set(&mut store, PropertyField::FontWeight, &"Bold".into()).unwrap();
        let ElementKind::Text(t) = &store.get(id).unwrap().kind else {
            panic!("text expected");
        };
        assert_eq!(t.font_size, 36.0);
        assert_eq!(t.weight, FontWeight::Bold);
    }

    #[test]
    fn rejects_bad_input() {
        let (mut store, _) = store_with(ElementSpec::text("hi", 0.0, 0.0));
        let editor = PropertyEditor::new();
        assert_eq!(
            editor.set(&mut store, PropertyField::Fill, &"#000".into()),
            Err(PropertyError::NotApplicable {
                field: "fill",
                kind: "text"
            })
        );
        assert!(matches!(
            editor.set(&mut store, PropertyField::TextColor, &"red".into()),
            Err(PropertyError::InvalidValue { field: "textColor", .. })
        ));
        assert!(matches!(
            editor.set(&mut store, PropertyField::Italic, &PropertyValue::Number(1.0)),
            Err(PropertyError::WrongType { .. })
        ));
        assert!(matches!(
            editor.set(&mut store, PropertyField::ZIndex, &PropertyValue::Number(-1.0)),
            Err(PropertyError::InvalidValue { .. })
        ));
        store.set_selection(None);
        assert_eq!(
            editor.set(&mut store, PropertyField::X, &PropertyValue::Number(1.0)),
            Err(PropertyError::NoSelection)
        );
    }

    #[test]
    fn panel_lists_applicable_fields() {
        let (store, _) = store_with(ElementSpec::image("data:x", 1.0, 2.0, 30.0, 40.0));
        let panel = PropertyEditor::new().panel(&store);
        assert_eq!(panel["type"], "image");
        assert_eq!(panel["src"], "data:x");
        assert_eq!(panel["brightness"], 1.0);
        assert!(panel.get("fill").is_none());

        let empty = SceneStore::new(&EditorConfig::default());
        assert_eq!(PropertyEditor::new().panel(&empty), serde_json::json!({}));
    }

    #[test]
    fn layer_actions_follow_selection() {
        let (mut store, id) = store_with(ElementSpec::shape(ShapeKind::Star, 0.0, 0.0));
        let editor = PropertyEditor::new();
        assert_eq!(editor.send_backward(&mut store), Ok(false));
        assert_eq!(editor.bring_forward(&mut store), Ok(true));
        assert_eq!(store.get(id).unwrap().z_index, 1);
        let copy = editor.duplicate(&mut store).unwrap();
        assert_eq!(store.selection().primary(), Some(copy));
        assert_eq!(editor.delete(&mut store), Ok(true));
        assert!(!store.scene().contains(copy));
        assert_eq!(editor.delete(&mut store), Err(PropertyError::NoSelection));
    }
}

//! Proportional fit-to-container layout.
//!
//! Scales an element so that it fills a fraction of a reference box. The
//! element carries a structured [`Transform`]; fitting replaces its scale
//! component by value, so repeated fits never compound.

use std::fmt;

/// Default fraction of the reference an element is scaled to fill.
pub const DEFAULT_FIT_TARGET: f64 = 0.9;

/// Rendered size of a box, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<ratatui::layout::Rect> for BoxSize {
    fn from(rect: ratatui::layout::Rect) -> Self {
        Self::new(rect.width as f64, rect.height as f64)
    }
}

/// What an element is fitted against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    /// The whole viewport (terminal area).
    Viewport,
    /// A specific box, e.g. the tile a title lives in.
    Box(BoxSize),
}

/// One function in a transform list.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformComponent {
    Scale(f64),
    /// Any other function, kept verbatim as `name` and `args`.
    Other { name: String, args: String },
}

impl fmt::Display for TransformComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformComponent::Scale(s) => write!(f, "scale({})", s),
            TransformComponent::Other { name, args } => write!(f, "{}({})", name, args),
        }
    }
}

/// Ordered list of transform functions applied to an element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transform {
    components: Vec<TransformComponent>,
}

impl Transform {
    /// Parse a transform string such as `"translate(4px, 2px) scale(1.5)"`.
    ///
    /// Unbalanced trailing input is ignored. A `scale` with a single numeric
    /// argument becomes [`TransformComponent::Scale`]; anything else is kept
    /// as-is.
    pub fn parse(input: &str) -> Self {
        let mut components = Vec::new();
        let mut rest = input.trim();

        while let Some(open) = rest.find('(') {
            let Some(close) = rest[open..].find(')').map(|i| open + i) else {
                break;
            };
            let name = rest[..open].trim().to_string();
            let args = rest[open + 1..close].trim().to_string();

            let component = match (name.as_str(), args.parse::<f64>()) {
                ("scale", Ok(value)) => TransformComponent::Scale(value),
                _ => TransformComponent::Other { name, args },
            };
            components.push(component);
            rest = rest[close + 1..].trim_start();
        }

        Self { components }
    }

    pub fn components(&self) -> &[TransformComponent] {
        &self.components
    }

    /// The current scale factor, if a scale component is present.
    pub fn scale(&self) -> Option<f64> {
        self.components.iter().find_map(|c| match c {
            TransformComponent::Scale(s) => Some(*s),
            _ => None,
        })
    }

    /// Set the scale, replacing an existing scale component in place or
    /// appending one.
    pub fn set_scale(&mut self, scale: f64) {
        let existing = self
            .components
            .iter_mut()
            .find(|c| matches!(c, TransformComponent::Scale(_)));

        match existing {
            Some(component) => *component = TransformComponent::Scale(scale),
            None => self.components.push(TransformComponent::Scale(scale)),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

/// An element that can be fitted: its natural (unscaled) size plus the
/// transform applied on top of it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub size: BoxSize,
    pub transform: Transform,
}

impl Element {
    pub fn new(size: BoxSize) -> Self {
        Self {
            size,
            transform: Transform::default(),
        }
    }

    /// Applied scale, 1.0 when none has been set.
    pub fn scale(&self) -> f64 {
        self.transform.scale().unwrap_or(1.0)
    }
}

/// Compute the scale that makes `element` fill `target` of `reference`.
///
/// Of the width and height ratios, the one farther from 1 is the binding
/// constraint. Returns `None` when either box is degenerate.
pub fn fit_scale(element: BoxSize, reference: BoxSize, target: f64) -> Option<f64> {
    let width_ratio = element.width / reference.width;
    let height_ratio = element.height / reference.height;

    let ratio = if (1.0 - width_ratio).abs() > (1.0 - height_ratio).abs() {
        width_ratio
    } else {
        height_ratio
    };

    let scale = target / ratio;
    (ratio.is_finite() && ratio > 0.0 && scale.is_finite()).then_some(scale)
}

/// Fit an element against a reference box or the viewport and store the
/// resulting scale in its transform. Returns the applied scale, or `None` if
/// nothing was changed.
pub fn fit(
    element: &mut Element,
    reference: Reference,
    viewport: BoxSize,
    target: f64,
) -> Option<f64> {
    let reference = match reference {
        Reference::Viewport => viewport,
        Reference::Box(size) => size,
    };

    let scale = fit_scale(element.size, reference, target)?;
    element.transform.set_scale(scale);
    Some(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: BoxSize = BoxSize {
        width: 120.0,
        height: 40.0,
    };

    #[test]
    fn test_width_binds_when_farther_from_one() {
        let mut el = Element::new(BoxSize::new(200.0, 50.0));
        let scale = fit(
            &mut el,
            Reference::Box(BoxSize::new(1000.0, 200.0)),
            VIEWPORT,
            DEFAULT_FIT_TARGET,
        )
        .unwrap();
        assert!((scale - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_height_binds_when_farther_from_one() {
        let scale = fit_scale(BoxSize::new(90.0, 10.0), BoxSize::new(100.0, 100.0), 0.9).unwrap();
        assert!((scale - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_fit_replaces_scale() {
        let mut el = Element::new(BoxSize::new(50.0, 50.0));
        el.transform = Transform::parse("translate(4px, 2px)");
        let reference = Reference::Box(BoxSize::new(100.0, 200.0));

        fit(&mut el, reference, VIEWPORT, 0.5);
        fit(&mut el, reference, VIEWPORT, 0.5);

        let scales = el
            .transform
            .components()
            .iter()
            .filter(|c| matches!(c, TransformComponent::Scale(_)))
            .count();
        assert_eq!(scales, 1);
        assert_eq!(el.transform.to_string(), "translate(4px, 2px) scale(2)");
    }

    #[test]
    fn test_fit_against_viewport() {
        let mut el = Element::new(BoxSize::new(60.0, 10.0));
        let scale = fit(&mut el, Reference::Viewport, VIEWPORT, 0.9).unwrap();
        // Height ratio 0.25 is farther from 1 than width ratio 0.5.
        assert!((scale - 3.6).abs() < 1e-9);
        assert_eq!(el.scale(), scale);
    }

    #[test]
    fn test_degenerate_boxes_leave_transform_alone() {
        let mut el = Element::new(BoxSize::new(0.0, 0.0));
        assert!(fit(&mut el, Reference::Viewport, VIEWPORT, 0.9).is_none());
        assert!(el.transform.scale().is_none());

        let mut el = Element::new(BoxSize::new(10.0, 1.0));
        let zero = Reference::Box(BoxSize::new(0.0, 0.0));
        assert!(fit(&mut el, zero, VIEWPORT, 0.9).is_none());
    }

    #[test]
    fn test_parse_round_trip_keeps_other_functions() {
        let t = Transform::parse("rotate(5deg) scale(2) translateX(3px)");
        assert_eq!(t.scale(), Some(2.0));
        assert_eq!(t.components().len(), 3);
        assert_eq!(t.to_string(), "rotate(5deg) scale(2) translateX(3px)");
    }
}

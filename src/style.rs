//! Stylesheet classes.
//!
//! The differ only needs two things from a style: a class name that is a pure function of its rules,
//! and the rule text to inject the first time that class name is seen.
//! [`Style`] is a small content-addressed implementation; anything else implementing [`Stylesheet`] works too.

use crate::{error::Result, host::Host};
use core::fmt::{self, Debug};
use hashbrown::HashSet;
use std::{borrow::Cow, collections::BTreeMap};
use tracing::{trace, warn};

/// A style as seen by the differ.
///
/// Implementations must return the same class name for the same rules
/// and should return different names for different rules.
pub trait Stylesheet {
	fn class_name(&self) -> Cow<'_, str>;
	fn css_text(&self) -> Cow<'_, str>;
}

/// Per-renderer cache of injected class names.
///
/// Injection is append-only: Rules stay in the shared stylesheet after the last element using them is gone.
#[derive(Debug, Default)]
pub struct StyleInjector {
	injected: HashSet<String>,
}

impl StyleInjector {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes sure `style`'s rules are in the host's stylesheet and returns its class name.
	///
	/// # Errors
	///
	/// Iff the host fails to append the rules. The class name isn't recorded in that case.
	pub fn inject<H: Host + ?Sized>(&mut self, host: &H, style: &dyn Stylesheet) -> Result<String> {
		let class_name = style.class_name().into_owned();
		if self.injected.contains(&class_name) {
			trace!(class_name = class_name.as_str(), "Style already injected.");
		} else {
			host.append_css(&style.css_text())?;
			trace!(class_name = class_name.as_str(), "Injected style.");
			self.injected.insert(class_name.clone());
		}
		Ok(class_name)
	}

	#[must_use]
	pub fn is_injected(&self, class_name: &str) -> bool {
		self.injected.contains(class_name)
	}

	/// How many distinct classes were injected so far.
	#[must_use]
	pub fn len(&self) -> usize {
		self.injected.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.injected.is_empty()
	}
}

/// Rewrites a `class` attribute value.
///
/// Tokens in `remove` are dropped, then tokens in `add` are appended in order unless already present.
/// Foreign tokens keep their place, duplicates are collapsed.
pub(crate) fn merge_class_tokens<'a>(current: &'a str, remove: &[&str], add: &[&'a str]) -> String {
	let mut tokens: Vec<&str> = Vec::new();
	for token in current.split_whitespace() {
		if !remove.contains(&token) && !tokens.contains(&token) {
			tokens.push(token);
		}
	}
	for token in add {
		if !tokens.contains(token) {
			tokens.push(*token);
		}
	}
	tokens.join(" ")
}

/// Pseudo-classes a [`Style`] can carry rule blocks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pseudo {
	Hover,
	Active,
	Focus,
	FocusWithin,
	FocusVisible,
}

impl Pseudo {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Pseudo::Hover => ":hover",
			Pseudo::Active => ":active",
			Pseudo::Focus => ":focus",
			Pseudo::FocusWithin => ":focus-within",
			Pseudo::FocusVisible => ":focus-visible",
		}
	}
}

type Declarations = BTreeMap<String, String>;

/// A content-addressed style: base declarations, pseudo-class blocks and media query blocks.
///
/// Values of well-known properties are validated as they are declared.
/// Invalid values are logged and replaced with a safe fallback (`black` for colours, `0` for lengths, `normal` for font weights).
///
/// ```rust
/// use vortex_dom::style::{Pseudo, Style, Stylesheet};
///
/// let button = Style::new()
/// 	.declare("color", "#fff")
/// 	.declare("padding", "4px")
/// 	.on(Pseudo::Hover, |hover| hover.declare("color", "red"));
/// let same = Style::new()
/// 	.declare("padding", "4px")
/// 	.on(Pseudo::Hover, |hover| hover.declare("color", "red"))
/// 	.declare("color", "#fff");
///
/// assert_eq!(button.class_name(), same.class_name());
/// assert!(button.css_text().contains(":hover {color: red;}"));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Style {
	base: Declarations,
	pseudos: BTreeMap<Pseudo, Declarations>,
	media: BTreeMap<String, Declarations>,
}

impl Debug for Style {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Style")
			.field("class_name", &self.class_name())
			.field("base", &self.base)
			.field("pseudos", &self.pseudos)
			.field("media", &self.media)
			.finish()
	}
}

impl Style {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a base declaration, replacing any previous value of the same property.
	#[must_use]
	pub fn declare(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
		let property = property.into();
		let value = validate(&property, value.into());
		self.base.insert(property, value);
		self
	}

	/// Adds declarations that apply under `pseudo`.
	///
	/// `block` receives an empty style; only its base declarations are used.
	#[must_use]
	pub fn on(mut self, pseudo: Pseudo, block: impl FnOnce(Style) -> Style) -> Self {
		let declarations = block(Style::new()).base;
		self.pseudos.entry(pseudo).or_default().extend(declarations);
		self
	}

	/// Adds declarations that apply under a media query, for example `"@media (max-width: 768px)"`.
	///
	/// `block` receives an empty style; only its base declarations are used.
	#[must_use]
	pub fn media(mut self, query: impl Into<String>, block: impl FnOnce(Style) -> Style) -> Self {
		let declarations = block(Style::new()).base;
		self.media.entry(query.into()).or_default().extend(declarations);
		self
	}

	/// A copy of this style with more rules applied on top. `self` is left as-is.
	#[must_use]
	pub fn extend(&self, with: impl FnOnce(Style) -> Style) -> Style {
		with(self.clone())
	}

	#[must_use]
	pub fn declaration(&self, property: &str) -> Option<&str> {
		self.base.get(property).map(String::as_str)
	}

	/// The rules without any class name, which the class name is derived from.
	fn content(&self) -> String {
		let mut content = declarations_to_css(&self.base);
		for (pseudo, declarations) in &self.pseudos {
			content.push_str(pseudo.as_str());
			content.push_str(&declarations_to_css(declarations));
		}
		for (query, declarations) in &self.media {
			content.push_str(query);
			content.push_str(&declarations_to_css(declarations));
		}
		content
	}
}

impl Stylesheet for Style {
	fn class_name(&self) -> Cow<'_, str> {
		format!("vtx-{}", fnv1a32(self.content().as_bytes())).into()
	}

	fn css_text(&self) -> Cow<'_, str> {
		let class_name = self.class_name();
		let mut css = format!(".{} {{{}}}\n", class_name, declarations_to_css(&self.base));
		for (pseudo, declarations) in &self.pseudos {
			css.push_str(&format!(".{}{} {{{}}}\n", class_name, pseudo.as_str(), declarations_to_css(declarations)));
		}
		for (query, declarations) in &self.media {
			css.push_str(&format!("{} {{ .{} {{{}}} }}\n", query, class_name, declarations_to_css(declarations)));
		}
		css.into()
	}
}

fn declarations_to_css(declarations: &Declarations) -> String {
	declarations
		.iter()
		.map(|(property, value)| format!("{}: {};", property, value))
		.collect::<Vec<_>>()
		.join(" ")
}

fn fnv1a32(bytes: &[u8]) -> u32 {
	const OFFSET_BASIS: u32 = 0x811c_9dc5;
	const PRIME: u32 = 0x0100_0193;
	bytes.iter().fold(OFFSET_BASIS, |hash, byte| (hash ^ u32::from(*byte)).wrapping_mul(PRIME))
}

const COLOR_PROPERTIES: &[&str] = &["color", "background-color", "border-color", "outline-color"];
const LENGTH_PROPERTIES: &[&str] = &[
	"width",
	"height",
	"min-width",
	"min-height",
	"max-width",
	"max-height",
	"margin",
	"margin-top",
	"margin-right",
	"margin-bottom",
	"margin-left",
	"padding",
	"padding-top",
	"padding-right",
	"padding-bottom",
	"padding-left",
	"border-width",
	"border-radius",
	"font-size",
	"gap",
];

const COLOR_KEYWORDS: &[&str] = &[
	"transparent",
	"currentColor",
	"inherit",
	"initial",
	"black",
	"white",
	"red",
	"green",
	"blue",
	"yellow",
	"purple",
	"orange",
	"pink",
	"brown",
	"gray",
	"grey",
	"silver",
	"gold",
	"maroon",
	"navy",
	"teal",
	"olive",
	"lime",
	"aqua",
	"fuchsia",
	"indigo",
	"violet",
	"turquoise",
];

const LENGTH_UNITS: &[&str] = &["px", "pt", "pc", "in", "mm", "cm", "em", "rem", "ex", "ch", "vw", "vh", "vmin", "vmax", "%"];

fn validate(property: &str, value: String) -> String {
	let (valid, fallback) = if COLOR_PROPERTIES.contains(&property) {
		(is_color(&value), "black")
	} else if LENGTH_PROPERTIES.contains(&property) {
		(value.split_whitespace().all(is_length), "0")
	} else if property == "font-weight" {
		(is_font_weight(&value), "normal")
	} else {
		(true, "")
	};

	if valid {
		value
	} else {
		warn!(property, value = value.as_str(), fallback, "Invalid CSS value, using fallback.");
		fallback.to_owned()
	}
}

fn is_color(value: &str) -> bool {
	if let Some(hex) = value.strip_prefix('#') {
		return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
	}
	for function in &["rgb(", "rgba(", "hsl(", "hsla("] {
		if let Some(arguments) = value.strip_prefix(function).and_then(|rest| rest.strip_suffix(')')) {
			let arguments: Vec<&str> = arguments.split(',').map(str::trim).collect();
			return matches!(arguments.len(), 3 | 4)
				&& arguments
					.iter()
					.all(|argument| !argument.is_empty() && argument.trim_end_matches('%').parse::<f64>().is_ok());
		}
	}
	COLOR_KEYWORDS.contains(&value)
}

fn is_length(value: &str) -> bool {
	if matches!(value, "0" | "auto" | "inherit" | "initial" | "revert" | "unset") {
		return true;
	}
	if value.starts_with("calc(") && value.ends_with(')') {
		return true;
	}
	LENGTH_UNITS.iter().any(|unit| {
		value
			.strip_suffix(unit)
			.map_or(false, |number| !number.is_empty() && !number.starts_with('+') && number.parse::<f64>().map_or(false, f64::is_finite))
	})
}

fn is_font_weight(value: &str) -> bool {
	match value.parse::<u16>() {
		Ok(weight) => (100..=900).contains(&weight) && weight % 100 == 0,
		Err(_) => matches!(value, "normal" | "bold" | "lighter" | "bolder" | "inherit" | "initial" | "revert" | "unset"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn fnv_reference_values() {
		assert_eq!(fnv1a32(b""), 0x811c_9dc5);
		assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
		assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
	}

	#[test]
	fn class_name_follows_content() {
		let a = Style::new().declare("color", "red").declare("margin", "4px");
		let b = Style::new().declare("margin", "4px").declare("color", "red");
		let c = Style::new().declare("color", "blue").declare("margin", "4px");
		assert_eq!(a.class_name(), b.class_name());
		assert_ne!(a.class_name(), c.class_name());
		assert!(a.class_name().starts_with("vtx-"));
	}

	#[test]
	fn css_text_layout() {
		let style = Style::new()
			.declare("padding", "2px 4px")
			.declare("color", "#123")
			.on(Pseudo::Hover, |s| s.declare("color", "red"))
			.media("@media (max-width: 600px)", |s| s.declare("padding", "0"));
		let class = style.class_name().into_owned();

		assert_eq!(
			style.css_text(),
			format!(
				".{0} {{color: #123; padding: 2px 4px;}}\n.{0}:hover {{color: red;}}\n@media (max-width: 600px) {{ .{0} {{padding: 0;}} }}\n",
				class
			)
		);
	}

	#[test]
	fn invalid_values_fall_back() {
		let style = Style::new()
			.declare("color", "not-a-colour")
			.declare("width", "12 parsecs")
			.declare("font-weight", "450")
			.declare("cursor", "anything goes");
		assert_eq!(style.declaration("color"), Some("black"));
		assert_eq!(style.declaration("width"), Some("0"));
		assert_eq!(style.declaration("font-weight"), Some("normal"));
		assert_eq!(style.declaration("cursor"), Some("anything goes"));
	}

	#[test]
	fn valid_values_pass() {
		for color in &["#fff", "#ffffff", "#ffff", "#ffffff00", "rgb(1, 2, 3)", "rgba(1, 2, 3, 0.5)", "hsl(120, 50%, 50%)", "teal"] {
			assert!(is_color(color), "{}", color);
		}
		for length in &["0", "auto", "1px", "1.5rem", "50%", "-2em", "calc(100% - 4px)"] {
			assert!(is_length(length), "{}", length);
		}
		assert!(!is_color("#ggg"));
		assert!(!is_length("px"));
	}

	#[test]
	fn extend_leaves_the_original() {
		let base = Style::new().declare("color", "red");
		let extended = base.extend(|s| s.declare("margin", "1px"));
		assert_eq!(base.declaration("margin"), None);
		assert_eq!(extended.declaration("color"), Some("red"));
		assert_ne!(base.class_name(), extended.class_name());
	}

	#[test]
	fn class_tokens_merge() {
		assert_eq!(merge_class_tokens("", &[], &["a", "vtx-1"]), "a vtx-1");
		assert_eq!(merge_class_tokens("foreign a vtx-1", &["a", "vtx-1"], &["b", "vtx-2"]), "foreign b vtx-2");
		assert_eq!(merge_class_tokens("a a  b", &[], &["b"]), "a b");
		assert_eq!(merge_class_tokens("x vtx-1", &["vtx-1"], &["vtx-1"]), "x vtx-1");
		assert_eq!(merge_class_tokens("vtx-1", &["vtx-1"], &[]), "");
		assert_eq!(merge_class_tokens("note vtx-1", &["note", "vtx-1"], &["note", "vtx-2"]), "note vtx-2");
	}
}

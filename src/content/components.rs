//! Embedded components that posts can reference by name
//!
//! A post body may contain MDX-style tags whose names start with an
//! uppercase letter, e.g. `<InfoText>Heads up!</InfoText>` or
//! `<InfoText tone="warning" />`. Each name must be registered in the
//! [`ComponentRegistry`] handed to the renderer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RenderError;
use crate::helpers::html_escape;

/// Attributes written on a component tag, in source order
pub type ComponentProps = Vec<(String, String)>;

/// A named renderer for an embedded component
pub trait Component: Send + Sync {
    /// Render the component. `children` is the already rendered inner HTML.
    fn render(&self, props: &ComponentProps, children: &str) -> Result<String, String>;
}

impl<F> Component for F
where
    F: Fn(&ComponentProps, &str) -> Result<String, String> + Send + Sync,
{
    fn render(&self, props: &ComponentProps, children: &str) -> Result<String, String> {
        self(props, children)
    }
}

/// Mapping from component name to its renderer
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: BTreeMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    /// An empty registry: every component reference is an error
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the components the site ships with
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("InfoText", InfoText);
        registry
    }

    pub fn register<C: Component + 'static>(&mut self, name: &str, component: C) -> &mut Self {
        self.components.insert(name.to_string(), Arc::new(component));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    /// Render `name`, failing if it is not registered
    pub fn render(
        &self,
        name: &str,
        props: &ComponentProps,
        children: &str,
    ) -> Result<String, RenderError> {
        let component = self
            .components
            .get(name)
            .ok_or_else(|| RenderError::UnknownComponent(name.to_string()))?;
        component
            .render(props, children)
            .map_err(|message| RenderError::Component {
                name: name.to_string(),
                message,
            })
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}

/// Highlighted call-out box
pub struct InfoText;

impl Component for InfoText {
    fn render(&self, props: &ComponentProps, children: &str) -> Result<String, String> {
        let tone = props
            .iter()
            .find(|(k, _)| k == "tone")
            .map(|(_, v)| v.as_str())
            .unwrap_or("info");
        if !tone.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("invalid tone `{}`", tone));
        }
        Ok(format!(
            r#"<aside class="info-text info-text-{}">{}</aside>"#,
            html_escape(tone),
            children.trim()
        ))
    }
}

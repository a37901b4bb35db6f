use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

pub type ComponentError = Box<dyn std::error::Error + Send + Sync>;
pub type Props = HashMap<String, Value>;

type RenderFn = Box<dyn Fn(&Props) -> Result<String, ComponentError> + Send + Sync>;
type HookFn = Box<dyn Fn(&Props) -> Result<(), ComponentError> + Send + Sync>;

pub struct Component {
    render: RenderFn,
    before_mount: Option<HookFn>,
    after_mount: Option<HookFn>,
}

impl Component {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&Props) -> Result<String, ComponentError> + Send + Sync + 'static,
    {
        Self {
            render: Box::new(render),
            before_mount: None,
            after_mount: None,
        }
    }

    pub fn before_mount<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Props) -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        self.before_mount = Some(Box::new(hook));
        self
    }

    pub fn after_mount<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Props) -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        self.after_mount = Some(Box::new(hook));
        self
    }
}

// A page template with {{name}} slots shared by every mounted component.
#[derive(Debug, Clone)]
pub struct PageShell {
    template: String,
    slots: HashMap<String, String>,
}

impl PageShell {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            slots: HashMap::new(),
        }
    }

    pub fn set_slot(&mut self, name: &str, markup: impl Into<String>) {
        self.slots.insert(name.to_string(), markup.into());
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }

    pub fn render(&self) -> String {
        let mut html = self.template.clone();
        for (name, markup) in &self.slots {
            html = html.replace(&format!("{{{{{name}}}}}"), markup);
        }
        html
    }
}

#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Component>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, component: Component) {
        self.components.insert(name.to_string(), component);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.components.remove(name).is_some()
    }

    // Render errors degrade to an empty slot, hook errors are logged and
    // skipped; neither can block the slot update or sibling components.
    pub fn mount(&self, name: &str, shell: &mut PageShell, slot: &str, props: &Props) -> bool {
        let Some(component) = self.components.get(name) else {
            warn!("cannot mount unknown component {name:?}");
            return false;
        };

        if let Some(hook) = &component.before_mount {
            if let Err(err) = hook(props) {
                warn!("beforeMount hook of {name} failed: {err}");
            }
        }

        let markup = match (component.render)(props) {
            Ok(markup) => markup,
            Err(err) => {
                warn!("render of component {name} failed: {err}");
                String::new()
            }
        };
        shell.set_slot(slot, markup);

        if let Some(hook) = &component.after_mount {
            if let Err(err) = hook(props) {
                warn!("afterMount hook of {name} failed: {err}");
            }
        }
        true
    }
}

//! Rendering generated Objective-C fragments.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use serde::Serialize;

use crate::domain::model::{InterfaceDecl, Ivar, Ownership};
use crate::infra::config::{Config, Generation};

const INITIALIZER: &str = "initializer";
const DEALLOC: &str = "dealloc";

/// Renders property declarations, the synthesize list, the designated initializer and `dealloc`.
pub struct Renderer {
    env: Environment<'static>,
    generation: Generation,
    initializer_override: Option<String>,
    dealloc_override: Option<String>,
}

impl Renderer {
    /// Create a renderer with built-in templates, loading any template files named in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
            generation: config.generation.clone(),
            initializer_override: load_override(config.templates.initializer.as_deref())?,
            dealloc_override: load_override(config.templates.dealloc.as_deref())?,
        })
    }

    /// `@property(<behaviors>) <type> <name>;`
    pub fn property(&self, ivar: &Ivar) -> String {
        format!(
            "@property({}) {} {};",
            self.behaviors(ivar).join(","),
            ivar.declared_type(),
            ivar.name
        )
    }

    /// `@synthesize a, b, c;` in declaration order.
    pub fn synthesize(&self, decl: &InterfaceDecl) -> String {
        let names: Vec<&str> = decl.ivars.iter().map(|ivar| ivar.name.as_str()).collect();
        format!("@synthesize {};", names.join(", "))
    }

    /// Selector of the designated initializer, one keyword per ivar.
    pub fn initializer_signature(&self, decl: &InterfaceDecl) -> String {
        let parts: Vec<String> = decl
            .ivars
            .iter()
            .enumerate()
            .map(|(index, ivar)| {
                let keyword = if index == 0 {
                    format!("{}{}", self.generation.initializer_prefix, ivar.camel_name())
                } else {
                    ivar.name.clone()
                };
                format!(
                    "{keyword}: ({}) {}",
                    ivar.declared_type(),
                    self.argument_name(ivar)
                )
            })
            .collect();
        format!("-(id) {}", parts.join(" "))
    }

    pub fn initializer_declaration(&self, decl: &InterfaceDecl) -> String {
        format!("{};", self.initializer_signature(decl))
    }

    pub fn initializer(&self, decl: &InterfaceDecl) -> Result<String> {
        let context = self.context(decl);
        self.render(INITIALIZER, self.initializer_override.as_deref(), &context)
    }

    pub fn dealloc(&self, decl: &InterfaceDecl) -> Result<String> {
        let context = self.context(decl);
        self.render(DEALLOC, self.dealloc_override.as_deref(), &context)
    }

    fn behaviors(&self, ivar: &Ivar) -> Vec<String> {
        let ownership = match ivar.ownership {
            Ownership::Assign => self.generation.assign_behavior.clone(),
            Ownership::Retain => self.generation.retain_behavior.clone(),
        };
        std::iter::once(ownership)
            .chain(self.generation.default_behaviors.iter().cloned())
            .collect()
    }

    fn argument_name(&self, ivar: &Ivar) -> String {
        format!("{}{}", self.generation.argument_prefix, ivar.camel_name())
    }

    fn context(&self, decl: &InterfaceDecl) -> TemplateContext {
        TemplateContext {
            signature: self.initializer_signature(decl),
            ivars: decl
                .ivars
                .iter()
                .map(|ivar| TemplateIvar {
                    name: ivar.name.clone(),
                    declared_type: ivar.declared_type(),
                    argument: self.argument_name(ivar),
                    behaviors: self.behaviors(ivar).join(","),
                    retained: ivar.is_retained(),
                })
                .collect(),
            released: decl.retained().map(|ivar| ivar.name.clone()).collect(),
        }
    }

    fn render(
        &self,
        name: &'static str,
        override_source: Option<&str>,
        context: &TemplateContext,
    ) -> Result<String> {
        if let Some(source) = override_source {
            let mut env = Environment::new();
            env.set_trim_blocks(true);
            env.set_lstrip_blocks(true);
            env.add_template(name, source)
                .map_err(|err| anyhow!("invalid {name} template: {err}"))?;
            return env
                .get_template(name)
                .and_then(|template| template.render(context))
                .map_err(|err| anyhow!("failed to render {name} template: {err}"));
        }

        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(|err| anyhow!("failed to render {name} template: {err}"))
    }
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(INITIALIZER, DEFAULT_INITIALIZER_TEMPLATE)
        .map_err(|err| anyhow!("failed to register default initializer template: {err}"))?;
    env.add_template(DEALLOC, DEFAULT_DEALLOC_TEMPLATE)
        .map_err(|err| anyhow!("failed to register default dealloc template: {err}"))?;
    Ok(env)
}

fn load_override(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    tracing::debug!(path = %path.display(), "loading template override");
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to load template from path {}", path.display()))?;
    Ok(Some(source))
}

#[derive(Serialize)]
struct TemplateContext {
    signature: String,
    ivars: Vec<TemplateIvar>,
    released: Vec<String>,
}

#[derive(Serialize)]
struct TemplateIvar {
    name: String,
    declared_type: String,
    argument: String,
    behaviors: String,
    retained: bool,
}

const DEFAULT_INITIALIZER_TEMPLATE: &str = r#"{{ signature }} {

    if (self = [super init]) {
{% for ivar in ivars %}
        self.{{ ivar.name }} = {{ ivar.argument }};
{% endfor %}
    }

    return self;
}
"#;

const DEFAULT_DEALLOC_TEMPLATE: &str = r#"-(void) dealloc {
{% for name in released %}
    [{{ name }} release];
{% endfor %}
    [super dealloc];
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::EnvOverrides;

    fn my_model() -> InterfaceDecl {
        InterfaceDecl {
            ivars: vec![
                Ivar::new("NSArray", "someItems", Ownership::Retain),
                Ivar::new("NSString", "text", Ownership::Retain),
                Ivar::new("int", "count", Ownership::Assign),
            ],
        }
    }

    #[test]
    fn renders_properties_with_ownership_first() -> Result<()> {
        let renderer = Renderer::new(&Config::default())?;
        let decl = my_model();
        assert_eq!(
            renderer.property(&decl.ivars[0]),
            "@property(retain,nonatomic) NSArray* someItems;"
        );
        assert_eq!(
            renderer.property(&decl.ivars[2]),
            "@property(assign,nonatomic) int count;"
        );
        Ok(())
    }

    #[test]
    fn renders_initializer_declaration() -> Result<()> {
        let renderer = Renderer::new(&Config::default())?;
        assert_eq!(
            renderer.initializer_declaration(&my_model()),
            "-(id) initWithSomeItems: (NSArray*) inSomeItems text: (NSString*) inText count: (int) inCount;"
        );
        assert_eq!(
            renderer.synthesize(&my_model()),
            "@synthesize someItems, text, count;"
        );
        Ok(())
    }

    #[test]
    fn initializer_assigns_every_ivar() -> Result<()> {
        let renderer = Renderer::new(&Config::default())?;
        let rendered = renderer.initializer(&my_model())?;
        assert!(rendered.starts_with("-(id) initWithSomeItems:"));
        assert!(rendered.contains("    if (self = [super init]) {\n        self.someItems = inSomeItems;\n        self.text = inText;\n        self.count = inCount;\n    }"));
        assert!(rendered.ends_with("return self;\n}"));
        Ok(())
    }

    #[test]
    fn dealloc_releases_only_retained_ivars() -> Result<()> {
        let renderer = Renderer::new(&Config::default())?;
        let rendered = renderer.dealloc(&my_model())?;
        assert_eq!(
            rendered,
            "-(void) dealloc {\n    [someItems release];\n    [text release];\n    [super dealloc];\n}"
        );
        Ok(())
    }

    #[test]
    fn respects_configured_conventions() -> Result<()> {
        let mut config = Config::default();
        config.generation.default_behaviors = vec!["atomic".into()];
        config.generation.retain_behavior = "strong".into();
        config.generation.argument_prefix = "a".into();
        config.generation.initializer_prefix = "initFrom".into();
        let renderer = Renderer::new(&config)?;
        let decl = my_model();

        assert_eq!(
            renderer.property(&decl.ivars[1]),
            "@property(strong,atomic) NSString* text;"
        );
        assert!(
            renderer
                .initializer_signature(&decl)
                .starts_with("-(id) initFromSomeItems: (NSArray*) aSomeItems text:")
        );
        Ok(())
    }

    #[test]
    fn template_override_replaces_builtin() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("dealloc.j2");
        fs::write(
            &path,
            "- (void)dealloc {\n{% for name in released %}\n    [{{ name }} release], {{ name }} = nil;\n{% endfor %}\n    [super dealloc];\n}\n",
        )?;
        let mut config = Config::default();
        config.templates.dealloc = Some(path);

        let rendered = Renderer::new(&config)?.dealloc(&my_model())?;
        assert!(rendered.contains("[text release], text = nil;"));
        Ok(())
    }

    #[test]
    fn relative_template_in_config_file_resolves_beside_it() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().join(".modelsmith");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("dealloc.j2"), "-(void) dealloc { [super dealloc]; }\n")?;
        fs::write(dir.join("config.toml"), "[templates]\ndealloc = \"dealloc.j2\"\n")?;

        let config = Config::load_with_layers(
            None,
            None,
            Some(dir.join("config.toml")),
            EnvOverrides::default(),
        )?;
        let rendered = Renderer::new(&config)?.dealloc(&my_model())?;
        assert_eq!(rendered, "-(void) dealloc { [super dealloc]; }");
        Ok(())
    }

    #[test]
    fn missing_template_file_is_an_error() {
        let mut config = Config::default();
        config.templates.initializer = Some("/nonexistent/initializer.j2".into());
        assert!(Renderer::new(&config).is_err());
    }
}

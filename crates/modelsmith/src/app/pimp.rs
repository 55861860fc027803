//! Splicing generated accessors, initializer and `dealloc` into a header/impl pair.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tempfile::NamedTempFile;

use crate::app::parse::parse_interface;
use crate::app::render::Renderer;
use crate::domain::errors::DomainError;
use crate::domain::model::InterfaceDecl;
use crate::infra::config::Config;

static END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^@end\b").expect("valid @end regex"));
static IMPLEMENTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@implementation.*").expect("valid @implementation regex"));

/// Which half of a [`SourcePair`] a fragment goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Header,
    Implementation,
}

impl Target {
    fn label(self) -> &'static str {
        match self {
            Target::Header => "header",
            Target::Implementation => "implementation",
        }
    }
}

/// Where a fragment lands relative to its anchor match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// Contents of an `@interface` header and its `@implementation` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    pub header: String,
    pub implementation: String,
}

impl SourcePair {
    pub fn new(header: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            implementation: implementation.into(),
        }
    }

    /// Insert `fragment`, surrounded by newlines, next to every match of `anchor`.
    pub fn insert(
        &mut self,
        target: Target,
        anchor: &Regex,
        placement: Placement,
        fragment: &str,
    ) -> Result<(), DomainError> {
        let text = match target {
            Target::Header => &mut self.header,
            Target::Implementation => &mut self.implementation,
        };

        if !anchor.is_match(text) {
            return Err(DomainError::MissingAnchor {
                anchor: anchor.as_str().to_owned(),
                target: target.label(),
            });
        }

        let wrapped = format!("\n{fragment}\n");
        let replaced = anchor
            .replace_all(text, |caps: &Captures| match placement {
                Placement::Before => format!("{wrapped}{}", &caps[0]),
                Placement::After => format!("{}{wrapped}", &caps[0]),
            })
            .into_owned();
        *text = replaced;
        Ok(())
    }
}

/// Generate accessors for `decl` into `pair`.
///
/// Properties are inserted one at a time in front of `@end`, last ivar first, so the header lists
/// them in reverse declaration order. The synthesize list keeps declaration order.
pub fn generate(pair: &mut SourcePair, decl: &InterfaceDecl, renderer: &Renderer) -> Result<()> {
    pair.insert(
        Target::Implementation,
        &END,
        Placement::Before,
        &renderer.dealloc(decl)?,
    )?;
    pair.insert(
        Target::Implementation,
        &IMPLEMENTATION,
        Placement::After,
        &renderer.synthesize(decl),
    )?;

    for ivar in decl.ivars.iter().rev() {
        pair.insert(
            Target::Header,
            &END,
            Placement::Before,
            &renderer.property(ivar),
        )?;
    }

    pair.insert(
        Target::Header,
        &END,
        Placement::Before,
        &renderer.initializer_declaration(decl),
    )?;
    pair.insert(
        Target::Implementation,
        &END,
        Placement::Before,
        &renderer.initializer(decl)?,
    )?;
    Ok(())
}

/// Parse the header half of `pair` and return the generated pair.
pub fn pimp_source(pair: &SourcePair, config: &Config) -> Result<(InterfaceDecl, SourcePair)> {
    let decl = parse_interface(&pair.header)?;
    let renderer = Renderer::new(config)?;
    let mut generated = pair.clone();
    generate(&mut generated, &decl, &renderer)?;
    Ok((decl, generated))
}

/// Implementation file matching `header`, e.g. `MyModel.h` -> `MyModel.m`.
pub fn implementation_path(header: &Path, extension: &str) -> PathBuf {
    header.with_extension(extension)
}

/// Runtime options for [`pimp_files`].
#[derive(Debug, Clone, Default)]
pub struct PimpOptions {
    /// Implementation file; derived from the header path when unset.
    pub implementation: Option<PathBuf>,
    /// Render without touching the files.
    pub dry_run: bool,
    /// Copy each file to `<file>.orig` before overwriting it.
    pub backup: bool,
}

/// Result of a [`pimp_files`] run.
#[derive(Debug, Clone)]
pub struct PimpOutcome {
    pub header_path: PathBuf,
    pub implementation_path: PathBuf,
    pub decl: InterfaceDecl,
    pub generated: SourcePair,
    pub written: bool,
}

/// Read a header and its implementation, generate accessors, and overwrite both unless dry-run.
pub fn pimp_files(header: &Path, options: &PimpOptions, config: &Config) -> Result<PimpOutcome> {
    let implementation = options
        .implementation
        .clone()
        .unwrap_or_else(|| implementation_path(header, &config.output.implementation_extension));

    let pair = SourcePair::new(read_source(header)?, read_source(&implementation)?);
    let (decl, generated) = pimp_source(&pair, config)
        .with_context(|| format!("failed to generate accessors for {}", header.display()))?;
    tracing::info!(
        header = %header.display(),
        ivars = decl.ivars.len(),
        "generated accessors"
    );

    let written = !options.dry_run;
    if written {
        let writes = [
            PendingWrite {
                path: header,
                contents: &generated.header,
                original: &pair.header,
            },
            PendingWrite {
                path: &implementation,
                contents: &generated.implementation,
                original: &pair.implementation,
            },
        ];
        commit(&writes, options.backup || config.output.backup)?;
    }

    Ok(PimpOutcome {
        header_path: header.to_path_buf(),
        implementation_path: implementation,
        decl,
        generated,
        written,
    })
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// A file about to be replaced, with the contents it had when it was read.
struct PendingWrite<'a> {
    path: &'a Path,
    contents: &'a str,
    original: &'a str,
}

/// Replace every file or none of them.
///
/// New contents are staged in temp files beside their targets and renamed into place. When a
/// rename fails, files already replaced get their original contents back.
fn commit(writes: &[PendingWrite<'_>], backup: bool) -> Result<()> {
    let mut staged = Vec::with_capacity(writes.len());
    for write in writes {
        staged.push(stage(write)?);
    }

    if backup {
        for write in writes {
            let backup_path = backup_path(write.path);
            fs::write(&backup_path, write.original).with_context(|| {
                format!(
                    "failed to back up {} to {}",
                    write.path.display(),
                    backup_path.display()
                )
            })?;
            tracing::debug!(path = %backup_path.display(), "wrote backup");
        }
    }

    for (index, (write, file)) in writes.iter().zip(staged).enumerate() {
        if let Err(err) = file.persist(write.path) {
            for done in &writes[..index] {
                if let Err(restore_err) = fs::write(done.path, done.original) {
                    tracing::warn!(
                        path = %done.path.display(),
                        error = %restore_err,
                        "failed to restore original contents"
                    );
                }
            }
            return Err(err.error)
                .with_context(|| format!("failed to write {}", write.path.display()));
        }
    }
    Ok(())
}

fn stage(write: &PendingWrite<'_>) -> Result<NamedTempFile> {
    let dir = write
        .path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    file.write_all(write.contents.as_bytes())
        .with_context(|| format!("failed to stage {}", write.path.display()))?;
    if let Ok(metadata) = fs::metadata(write.path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .with_context(|| format!("failed to copy permissions of {}", write.path.display()))?;
    }
    Ok(file)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".orig");
    PathBuf::from(name)
}

//! The driver: loads syntax and builtins, parses source files, evaluates
//! them in order and reports results and errors.
//!
//! Exit codes: 0 on success, 1 on any parse, type or evaluation error.
//! (Command-line misuse exits 2 through clap before the driver runs.)

use std::fs;
use std::io::Write;
use std::path::Path;

use xl_core::{Arena, Deserializer, NOWHERE, NodeId, Positions, Serializer, trees_equal};
use xl_eval::{Context, PrintTracer};
use xl_syntax::{Renderer, StyleSheet, Syntax, parse_source};

use crate::cli::Params;
use crate::dump;

pub const DEFAULT_SYNTAX: &str = "xl.syntax";
pub const DEFAULT_STYLE: &str = "xl.stylesheet";
pub const DEFAULT_BUILTINS: &str = "builtins.xl";

pub struct Driver {
    params: Params,
    arena: Arena,
    syntax: Syntax,
    styles: StyleSheet,
    positions: Positions,
    context: Context,
}

/// Run the driver, writing results to `out` and problems to `err`.
/// Returns the process exit code.
pub fn run(params: Params, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    let mut driver = match Driver::new(params, err) {
        Ok(driver) => driver,
        Err(code) => return code,
    };
    driver.main(out, err)
}

impl Driver {
    fn new(params: Params, err: &mut dyn Write) -> Result<Self, i32> {
        // Syntax: explicit file, the file in the working directory, or the
        // built-in table.
        let syntax = match &params.syntax {
            Some(path) => {
                let mut syntax = Syntax::new();
                if let Err(error) = syntax.read_file(path) {
                    let _ = writeln!(err, "error: {error}");
                    return Err(1);
                }
                syntax
            }
            None if Path::new(DEFAULT_SYNTAX).is_file() => {
                let mut syntax = Syntax::new();
                if let Err(error) = syntax.read_file(Path::new(DEFAULT_SYNTAX)) {
                    let _ = writeln!(err, "error: {error}");
                    return Err(1);
                }
                syntax
            }
            None => Syntax::standard(),
        };

        let styles = match &params.style {
            Some(path) => {
                let mut styles = StyleSheet::new();
                if let Err(error) = styles.read_file(path) {
                    let _ = writeln!(err, "error: {error}");
                    return Err(1);
                }
                styles
            }
            None if Path::new(DEFAULT_STYLE).is_file() => {
                let mut styles = StyleSheet::new();
                if let Err(error) = styles.read_file(Path::new(DEFAULT_STYLE)) {
                    let _ = writeln!(err, "error: {error}");
                    return Err(1);
                }
                styles
            }
            None => StyleSheet::standard(),
        };

        let mut context = Context::new();
        if let Some(depth) = params.depth {
            context = context.with_depth_limit(depth);
        }

        Ok(Self {
            params,
            arena: Arena::new(),
            syntax,
            styles,
            positions: Positions::new(),
            context,
        })
    }

    fn main(&mut self, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        if let Some((first, second)) = self.params.diff.clone() {
            return self.diff(&first, &second, err);
        }

        // Builtins: rewrites from the builtins file first, so its composite
        // forms take precedence, then the native table.
        let builtins = self
            .params
            .builtins
            .clone()
            .or_else(|| {
                let default = Path::new(DEFAULT_BUILTINS);
                default.is_file().then(|| default.to_path_buf())
            });
        if !self.params.parse_only && !self.params.ast {
            if let Some(path) = builtins {
                match self.load(&path, err) {
                    Ok(tree) => {
                        if let Err(error) = self.context.eval(&mut self.arena, &self.syntax, tree)
                        {
                            self.report(&error, err);
                            return 1;
                        }
                    }
                    Err(code) => return code,
                }
            }
            xl_eval::install_builtins(
                &mut self.arena,
                &mut self.syntax,
                &mut self.positions,
                &mut self.context,
            );
        }

        let mut serializer = match self.params.write_serialized.clone() {
            Some(path) => match fs::File::create(&path) {
                Ok(file) => match Serializer::new(file) {
                    Ok(serializer) => Some(serializer),
                    Err(error) => {
                        let _ = writeln!(err, "error: cannot write {}: {error}", path.display());
                        return 1;
                    }
                },
                Err(error) => {
                    let _ = writeln!(err, "error: cannot create {}: {error}", path.display());
                    return 1;
                }
            },
            None => None,
        };

        let mut trace = if self.params.traces.is_empty() {
            None
        } else {
            for name in &self.params.traces {
                if !PrintTracer::is_known(name) {
                    let _ = writeln!(
                        err,
                        "warning: unknown trace '{name}' (expected one of: {})",
                        xl_eval::TRACE_NAMES.join(", ")
                    );
                }
            }
            Some(PrintTracer::with_categories(
                self.params.traces.iter().map(String::as_str),
            ))
        };
        let mut failed = false;
        for path in self.params.files.clone() {
            let tree = match self.load(&path, err) {
                Ok(tree) => tree,
                Err(code) => return code,
            };

            if let Some(serializer) = &mut serializer
                && let Err(error) = serializer.write_tree(&self.arena, Some(tree))
            {
                let _ = writeln!(err, "error: serialization failed: {error}");
                return 1;
            }

            if self.params.ast {
                let json = dump::to_json(&self.arena, tree);
                match serde_json::to_string_pretty(&json) {
                    Ok(text) => {
                        let _ = writeln!(out, "{text}");
                    }
                    Err(error) => {
                        let _ = writeln!(err, "error: {error}");
                        return 1;
                    }
                }
                continue;
            }

            if self.params.parse_only {
                let rendered = Renderer::with_styles(&self.syntax, self.styles.clone())
                    .render(&self.arena, tree);
                let _ = writeln!(out, "{}", rendered.trim_end());
                continue;
            }

            let result = match &mut trace {
                Some(tracer) => {
                    self.context
                        .eval_with(&mut self.arena, &self.syntax, tree, tracer)
                }
                None => self.context.eval(&mut self.arena, &self.syntax, tree),
            };
            match result {
                Ok(value) => {
                    let rendered = Renderer::with_styles(&self.syntax, self.styles.clone())
                        .render(&self.arena, value);
                    let _ = writeln!(out, "{}", rendered.trim_end());
                }
                Err(error) => {
                    self.report(&error, err);
                    failed = true;
                }
            }
        }

        if failed { 1 } else { 0 }
    }

    /// Load one input file: serialized stream or XL source.
    fn load(&mut self, path: &Path, err: &mut dyn Write) -> Result<NodeId, i32> {
        if self.params.read_serialized {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(error) => {
                    let _ = writeln!(err, "error: cannot read {}: {error}", path.display());
                    return Err(1);
                }
            };
            let tree = Deserializer::new(bytes.as_slice(), NOWHERE)
                .and_then(|mut reader| reader.read_tree(&mut self.arena));
            return match tree {
                Ok(Some(tree)) => {
                    self.arena.pin(tree);
                    Ok(tree)
                }
                Ok(None) => {
                    let _ = writeln!(err, "error: {} holds a null tree", path.display());
                    Err(1)
                }
                Err(error) => {
                    let _ = writeln!(err, "error: bad stream {}: {error}", path.display());
                    Err(1)
                }
            };
        }

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                let _ = writeln!(err, "error: cannot read {}: {error}", path.display());
                return Err(1);
            }
        };
        let name = path.display().to_string();
        let result = parse_source(
            &name,
            &source,
            &mut self.arena,
            &mut self.syntax,
            &mut self.positions,
        );
        if result.diagnostics.has_errors() {
            let rendered = result
                .diagnostics
                .printer()
                .positions(&self.positions)
                .render();
            let _ = writeln!(err, "{rendered}");
            return Err(1);
        }
        match result.root {
            Some(tree) => {
                // Loaded file trees are collection roots for their lifetime.
                self.arena.pin(tree);
                Ok(tree)
            }
            None => {
                let _ = writeln!(err, "error: {} is empty", path.display());
                Err(1)
            }
        }
    }

    fn diff(&mut self, first: &Path, second: &Path, err: &mut dyn Write) -> i32 {
        let Ok(a) = self.load(first, err) else {
            return 1;
        };
        let Ok(b) = self.load(second, err) else {
            return 1;
        };
        if trees_equal(&self.arena, a, b) { 0 } else { 1 }
    }

    fn report(&self, error: &xl_eval::EvalError, err: &mut dyn Write) {
        match self.positions.resolve(error.pos) {
            Some(location) => {
                let _ = writeln!(err, "{location}: error: {error}");
                let _ = writeln!(err, "    {}", location.source_line);
            }
            None => {
                let _ = writeln!(err, "error: {error}");
            }
        }
        for (message, pos) in &error.related {
            if let Some(location) = self.positions.resolve(*pos) {
                let _ = writeln!(err, "{location}: note: {message}");
            }
        }
    }
}

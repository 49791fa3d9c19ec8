//! ES module linker
//!
//! Combines the module subset emitted by the component transpiler into one
//! script body: every reachable module becomes a function in a numbered
//! module table and imports become calls to a local `__kiln_require`. The
//! entry module runs with the `exports` object of the surrounding wrapper.
//!
//! Supported forms:
//! - `import X from`, `import { a, b as c } from`, `import * as ns from`,
//!   `import "side-effect"`
//! - `export const|let|var|function|class name`, `export default ...`
//! - `export { a, b as c }`, `export { a } from`, `export * from`,
//!   `export * as ns from`
//!
//! Imports that cannot be resolved to a file are reported through the
//! warning sink and bound to an empty module.

use super::{BundledCode, BundlerError, ModuleBundler, WarningSink};
use crate::entry::ENTRY_KEY;
use crate::error::BuildError;
use crate::module_resolver::{normalize_module_path, ModuleHost};
use regex::{Captures, Regex};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write;
use std::path::Path;
use std::sync::OnceLock;

const RUNTIME: &str = r#"const __kiln_cache = {};
function __kiln_require(id) {
  if (id in __kiln_cache) return __kiln_cache[id];
  const exports = (__kiln_cache[id] = {});
  __kiln_modules[id](exports, __kiln_require);
  return exports;
}
function __kiln_export(exports, getters) {
  for (const name in getters) {
    Object.defineProperty(exports, name, { enumerable: true, get: getters[name] });
  }
}
function __kiln_export_star(exports, source) {
  for (const name in source) {
    if (name !== "default" && !(name in exports)) {
      Object.defineProperty(exports, name, { enumerable: true, get: () => source[name] });
    }
  }
}
"#;

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*import\s*(?:(?P<default>[\w$]+)\s*,?\s*)?(?:\*\s*as\s+(?P<ns>[\w$]+)\s*)?(?:\{(?P<named>[^}]*)\}\s*)?(?:from\s*)?["'](?P<spec>[^"'\n]+)["'][ \t]*;?"#,
        )
        .expect("import pattern is valid")
    })
}

fn export_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*export\s*(?:\*\s*(?:as\s+(?P<ns>[\w$]+)\s*)?|\{(?P<list>[^}]*)\}\s*)from\s*["'](?P<spec>[^"'\n]+)["'][ \t]*;?"#,
        )
        .expect("re-export pattern is valid")
    })
}

fn export_list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*export\s*\{(?P<list>[^}]*)\}[ \t]*;?")
            .expect("export list pattern is valid")
    })
}

fn export_default_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(?P<indent>[ \t]*)export\s+default\s+(?P<keyword>(?:async\s+)?function\s*\*?\s*|class\s+)(?P<name>[\w$]+)",
        )
        .expect("default declaration pattern is valid")
    })
}

fn export_default_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?P<indent>[ \t]*)export\s+default\s+")
            .expect("default export pattern is valid")
    })
}

fn export_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(?P<indent>[ \t]*)export\s+(?P<keyword>(?:async\s+)?function\s*\*?\s*|class\s+|const\s+|let\s+|var\s+)(?P<name>[\w$]+)",
        )
        .expect("export declaration pattern is valid")
    })
}

/// Default [`ModuleBundler`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleLinker;

impl ModuleLinker {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleBundler for ModuleLinker {
    fn bundle(
        &self,
        entry_id: &str,
        host: &dyn ModuleHost,
        warnings: &mut dyn WarningSink,
    ) -> Result<BundledCode, BundlerError> {
        let mut graph = ModuleGraph::new(host, warnings);
        graph.intern(entry_id.to_string(), None);

        while let Some(index) = graph.queue.pop_front() {
            graph.link(index)?;
        }

        Ok(BundledCode {
            code: graph.render(),
            warnings: Vec::new(),
        })
    }
}

/// Where an import specifier points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Module(usize),
    External,
}

impl Target {
    fn expr(self) -> String {
        match self {
            Target::Module(index) => format!("__kiln_require({})", index),
            Target::External => "({})".to_string(),
        }
    }
}

struct ModuleGraph<'a> {
    host: &'a dyn ModuleHost,
    warnings: &'a mut dyn WarningSink,
    indices: HashMap<String, usize>,
    ids: Vec<String>,
    importers: Vec<Option<String>>,
    bodies: Vec<String>,
    queue: VecDeque<usize>,
}

impl<'a> ModuleGraph<'a> {
    fn new(host: &'a dyn ModuleHost, warnings: &'a mut dyn WarningSink) -> Self {
        Self {
            host,
            warnings,
            indices: HashMap::new(),
            ids: Vec::new(),
            importers: Vec::new(),
            bodies: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn intern(&mut self, id: String, importer: Option<&str>) -> usize {
        if let Some(&index) = self.indices.get(&id) {
            return index;
        }
        let index = self.ids.len();
        self.indices.insert(id.clone(), index);
        self.ids.push(id);
        self.importers.push(importer.map(str::to_string));
        self.bodies.push(String::new());
        self.queue.push_back(index);
        index
    }

    fn link(&mut self, index: usize) -> Result<(), BundlerError> {
        let id = self.ids[index].clone();
        let source = self.load(index, &id)?;

        check_balanced(&source).map_err(|message| BundlerError::Syntax {
            module: display_id(&id).to_string(),
            message,
        })?;

        let mut targets = HashMap::new();
        for spec in specifiers(&source) {
            if !targets.contains_key(spec) {
                let target = self.resolve(spec, &id);
                targets.insert(spec.to_string(), target);
            }
        }

        self.bodies[index] = rewrite(&source, &targets);
        Ok(())
    }

    fn load(&self, index: usize, id: &str) -> Result<String, BundlerError> {
        match self.host.load(id) {
            Ok(Some(source)) => Ok(source),
            Ok(None) => Err(self.missing(index, id)),
            Err(BuildError::IoError { error, .. }) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(self.missing(index, id))
            }
            Err(e) => Err(BundlerError::Host(e)),
        }
    }

    fn missing(&self, index: usize, id: &str) -> BundlerError {
        match &self.importers[index] {
            Some(importer) => BundlerError::Unresolved {
                importee: id.to_string(),
                importer: display_id(importer).to_string(),
            },
            None => BundlerError::MissingModule { id: id.to_string() },
        }
    }

    fn resolve(&mut self, spec: &str, importer: &str) -> Target {
        if let Some(resolved) = self.host.resolve_id(spec, Some(importer)) {
            return Target::Module(self.intern(resolved, Some(importer)));
        }

        if is_path_specifier(spec) {
            let path = normalize_module_path(spec, Some(importer));
            return Target::Module(self.intern(path.to_string_lossy().into_owned(), Some(importer)));
        }

        self.warnings.warn(format!(
            "'{}' is imported by {}, but could not be resolved - treating it as an external dependency",
            spec,
            display_id(importer)
        ));
        Target::External
    }

    fn render(&self) -> String {
        let mut out = String::from("const __kiln_modules = {\n");
        for (index, body) in self.bodies.iter().enumerate() {
            let _ = writeln!(out, "{}: function (exports, __kiln_require) {{", index);
            out.push_str(body);
            if !body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("},\n");
        }
        out.push_str("};\n");
        out.push_str(RUNTIME);
        out.push_str("__kiln_cache[0] = exports;\n");
        out.push_str("__kiln_modules[0](exports, __kiln_require);\n");
        out
    }
}

fn display_id(id: &str) -> &str {
    if id == ENTRY_KEY {
        "the bundle entry"
    } else {
        id
    }
}

fn is_path_specifier(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../") || Path::new(spec).is_absolute()
}

/// Import and re-export specifiers in source order
fn specifiers(source: &str) -> Vec<&str> {
    let mut found: Vec<(usize, &str)> = import_re()
        .captures_iter(source)
        .chain(export_from_re().captures_iter(source))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let spec = caps.name("spec")?;
            Some((whole.start(), spec.as_str()))
        })
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, spec)| spec).collect()
}

/// Split `a, b as c` into `(a, b)` pairs of (source name, bound name)
fn parse_bindings(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once(" as ") {
            Some((name, alias)) => (name.trim().to_string(), alias.trim().to_string()),
            None => (item.to_string(), item.to_string()),
        })
        .collect()
}

fn quote(name: &str) -> String {
    serde_json::to_string(name).unwrap_or_else(|_| format!("\"{}\"", name))
}

/// Rewrite one module's imports and exports
fn rewrite(source: &str, targets: &HashMap<String, Target>) -> String {
    let target_of = |spec: &str| targets.get(spec).copied().unwrap_or(Target::External);
    let mut getters: Vec<(String, String)> = Vec::new();
    let mut star_exports: Vec<String> = Vec::new();

    let text = export_from_re().replace_all(source, |caps: &Captures| {
        let target = target_of(&caps["spec"]).expr();
        if let Some(list) = caps.name("list") {
            for (name, exported) in parse_bindings(list.as_str()) {
                getters.push((exported, format!("{}[{}]", target, quote(&name))));
            }
        } else if let Some(ns) = caps.name("ns") {
            getters.push((ns.as_str().to_string(), target));
        } else {
            star_exports.push(target);
        }
        String::new()
    });

    let text = import_re().replace_all(&text, |caps: &Captures| {
        let target = target_of(&caps["spec"]);
        let expr = target.expr();
        let mut statements = Vec::new();

        if let Some(default) = caps.name("default") {
            statements.push(format!("const {} = {}.default;", default.as_str(), expr));
        }
        if let Some(ns) = caps.name("ns") {
            statements.push(format!("const {} = {};", ns.as_str(), expr));
        }
        if let Some(named) = caps.name("named") {
            let bindings: Vec<String> = parse_bindings(named.as_str())
                .into_iter()
                .map(|(name, local)| {
                    if name == local {
                        name
                    } else {
                        format!("{}: {}", name, local)
                    }
                })
                .collect();
            statements.push(format!("const {{ {} }} = {};", bindings.join(", "), expr));
        }
        if statements.is_empty() && target != Target::External {
            statements.push(format!("{};", expr));
        }
        statements.join(" ")
    });

    let text = export_default_decl_re().replace_all(&text, |caps: &Captures| {
        getters.push(("default".to_string(), caps["name"].to_string()));
        format!("{}{}{}", &caps["indent"], &caps["keyword"], &caps["name"])
    });

    let text = export_default_re().replace_all(&text, |caps: &Captures| {
        format!("{}exports.default = ", &caps["indent"])
    });

    let text = export_decl_re().replace_all(&text, |caps: &Captures| {
        getters.push((caps["name"].to_string(), caps["name"].to_string()));
        format!("{}{}{}", &caps["indent"], &caps["keyword"], &caps["name"])
    });

    let text = export_list_re().replace_all(&text, |caps: &Captures| {
        for (local, exported) in parse_bindings(&caps["list"]) {
            getters.push((exported, local));
        }
        String::new()
    });

    let mut body = String::new();
    if !getters.is_empty() {
        body.push_str("__kiln_export(exports, {\n");
        for (name, expr) in &getters {
            let _ = writeln!(body, "  {}: () => {},", quote(name), expr);
        }
        body.push_str("});\n");
    }
    for star in &star_exports {
        let _ = writeln!(body, "__kiln_export_star(exports, {});", star);
    }
    body.push_str(&text);
    body
}

/// Check that brackets balance outside strings, comments and regex literals
fn check_balanced(source: &str) -> Result<(), String> {
    let chars: Vec<char> = source.chars().collect();
    // (opening char, line); '`' marks template text, '$' a template expression
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if matches!(stack.last(), Some(('`', _))) {
            match c {
                '\\' => i += 1,
                '\n' => line += 1,
                '`' => {
                    stack.pop();
                    prev = Some('`');
                }
                '$' if next == Some('{') => {
                    stack.push(('$', line));
                    i += 1;
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                let start = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => return Err(format!("unterminated comment starting on line {}", start)),
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 1;
                            break;
                        }
                        Some('\n') => line += 1,
                        _ => {}
                    }
                    i += 1;
                }
            }
            '/' if prev.map_or(true, |p| "(,=:[!&|?{};+-*%<>~^".contains(p)) => {
                let start = line;
                let mut in_class = false;
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(format!("unterminated regular expression on line {}", start))
                        }
                        Some('\\') => i += 1,
                        Some('[') => in_class = true,
                        Some(']') => in_class = false,
                        Some('/') if !in_class => break,
                        _ => {}
                    }
                    i += 1;
                }
                prev = Some('/');
            }
            '"' | '\'' => {
                let quote = c;
                let start = line;
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(format!("unterminated string literal on line {}", start))
                        }
                        Some('\\') => i += 1,
                        Some(&q) if q == quote => break,
                        _ => {}
                    }
                    i += 1;
                }
                prev = Some(quote);
            }
            '`' => stack.push(('`', line)),
            '(' | '[' | '{' => {
                stack.push((c, line));
                prev = Some(c);
            }
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some(('$', _)) if c == '}' => {}
                    Some((open, _)) if open == expected => {}
                    Some((open, opened)) => {
                        return Err(format!(
                            "unexpected '{}' on line {}; '{}' opened on line {} is not closed",
                            c,
                            line,
                            printable(open),
                            opened
                        ))
                    }
                    None => return Err(format!("unexpected '{}' on line {}", c, line)),
                }
                prev = Some(c);
            }
            _ => prev = Some(c),
        }
        i += 1;
    }

    match stack.pop() {
        Some((open, opened)) => Err(format!(
            "'{}' opened on line {} is never closed",
            printable(open),
            opened
        )),
        None => Ok(()),
    }
}

fn printable(open: char) -> &'static str {
    match open {
        '(' => "(",
        '[' => "[",
        '{' => "{",
        '`' => "`",
        _ => "${",
    }
}

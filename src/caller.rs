//! Identifies the code that called into the runner.
//!
//! The derivation itself works on an explicit list of [`Frame`]s, so it can be
//! exercised without a real call stack. [`CallerInfo::capture`] feeds it the
//! frames of the current thread.

use crate::error::{Error, Result};

use std::fmt;

const COMPONENT: &str = module_path!();
const CAPTURE_COMPONENT: &str = "backtrace";
const RUNTIME_BOUNDARY: &str = "__rust_begin_short_backtrace";
const CALL_SHIM: &str = "core::ops::function";
const UNKNOWN: &str = "<unknown>";

/// One symbol on the call stack, split into the path that owns it and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The module or type path, empty for a bare symbol.
    pub component: String,
    /// The function name.
    pub operation: String,
}

impl Frame {
    /// A frame from already separated parts.
    pub fn new<C: Into<String>, O: Into<String>>(component: C, operation: O) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
        }
    }

    /// Parses a demangled symbol such as `app::jobs::run::h0123456789abcdef`
    /// into component `app::jobs` and operation `run`.
    pub fn parse(symbol: &str) -> Self {
        let symbol = strip_hash(symbol);
        match split_last_segment(symbol) {
            Some((component, operation)) => Frame::new(component, operation),
            None => Frame::new("", symbol),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.component.is_empty() {
            f.write_str(&self.operation)
        } else {
            write!(f, "{}::{}", self.component, self.operation)
        }
    }
}

fn strip_hash(symbol: &str) -> &str {
    if let Some(index) = symbol.rfind("::h") {
        let hash = &symbol[index + 3..];
        if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return &symbol[..index];
        }
    }
    symbol
}

/// Splits on the last `::` that is not nested inside `<...>`.
fn split_last_segment(symbol: &str) -> Option<(&str, &str)> {
    let bytes = symbol.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == b':' => split = Some(i),
            _ => {}
        }
    }
    split.map(|i| (&symbol[..i], &symbol[i + 2..]))
}

fn within(component: &str, owner: &str) -> bool {
    component == owner
        || (component.starts_with(owner) && component[owner.len()..].starts_with("::"))
}

fn is_capture_machinery(component: &str) -> bool {
    within(component, CAPTURE_COMPONENT)
}

/// The capture machinery, or `capture` itself when the machinery is inlined.
fn is_capture_call(component: &str) -> bool {
    is_capture_machinery(component) || within(component, COMPONENT)
}

fn is_skipped(component: &str) -> bool {
    is_capture_machinery(component)
        || within(component, COMPONENT)
        || within(component, crate::runner::COMPONENT)
}

/// Who called the runner, and whether that caller is the program's entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerInfo {
    component: String,
    operation: String,
    is_entry_point: bool,
}

impl CallerInfo {
    /// For environments where the stack cannot be inspected.
    pub fn new<C: Into<String>, O: Into<String>>(
        component: C,
        operation: O,
        is_entry_point: bool,
    ) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
            is_entry_point,
        }
    }

    /// Derives the caller from `frames`, innermost first.
    ///
    /// The first frame must be the stack capture itself. The caller is the first
    /// frame after it that belongs neither to the capture machinery nor to this
    /// crate's caller/runner modules. It is the entry point iff its operation is
    /// `main` and it is the outermost frame.
    pub fn from_frames(frames: &[Frame]) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| Error::internal("captured call stack is empty"))?;
        if !is_capture_call(&first.component) {
            return Err(Error::internal(format!(
                "first frame `{}` is not the stack capture call",
                first
            )));
        }

        let index = (1..frames.len())
            .find(|&i| !is_skipped(&frames[i].component))
            .ok_or_else(|| Error::internal("failed to find the calling frame"))?;

        let frame = &frames[index];
        Ok(Self {
            component: frame.component.clone(),
            operation: frame.operation.clone(),
            is_entry_point: frame.operation == "main" && index == frames.len() - 1,
        })
    }

    /// Walks the current thread's stack and derives the caller from it.
    ///
    /// Frames outside the program's own code (the runtime start-up and thread
    /// trampolines) are cut off first, so a binary's `main` ends up outermost.
    #[inline(never)]
    pub fn capture() -> Result<Self> {
        let mut frames = Vec::new();
        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                let name = symbol
                    .name()
                    .map(|name| format!("{:#}", name))
                    .unwrap_or_else(|| UNKNOWN.to_string());
                frames.push(Frame::parse(&name));
            });
            true
        });
        log::trace!("captured {} frames", frames.len());
        Self::from_frames(&trim_runtime(frames))
    }

    /// Path of the module (or type) the caller lives in.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Name of the calling function.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Whether the caller is `main` at the bottom of the stack.
    pub fn is_entry_point(&self) -> bool {
        self.is_entry_point
    }
}

fn trim_runtime(mut frames: Vec<Frame>) -> Vec<Frame> {
    if let Some(boundary) = frames
        .iter()
        .position(|frame| frame.operation == RUNTIME_BOUNDARY)
    {
        frames.truncate(boundary);
        while frames
            .last()
            .map_or(false, |frame| frame.component.contains(CALL_SHIM))
        {
            frames.pop();
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(symbols: &[&str]) -> Vec<Frame> {
        symbols.iter().map(|s| Frame::parse(s)).collect()
    }

    #[test]
    fn parse_splits_component_and_operation() {
        assert_eq!(Frame::parse("app::jobs::run"), Frame::new("app::jobs", "run"));
        assert_eq!(
            Frame::parse("app::main::h0123456789abcdef"),
            Frame::new("app", "main")
        );
        assert_eq!(Frame::parse("main"), Frame::new("", "main"));
        assert_eq!(
            Frame::parse("<app::Job as core::ops::Drop>::drop"),
            Frame::new("<app::Job as core::ops::Drop>", "drop")
        );
        assert_eq!(
            Frame::parse("app::run::<fn() -> u8>"),
            Frame::new("app::run", "<fn() -> u8>")
        );
    }

    #[test]
    fn finds_entry_point_main() {
        let stack = frames(&[
            "backtrace::backtrace::libunwind::trace",
            "execute::caller::CallerInfo::capture",
            "execute::runner::then_exit_if_entry_point",
            "app::main",
        ]);
        let caller = CallerInfo::from_frames(&stack).unwrap();
        assert_eq!(caller.component(), "app");
        assert_eq!(caller.operation(), "main");
        assert!(caller.is_entry_point());
    }

    #[test]
    fn nested_main_is_not_entry_point() {
        let stack = frames(&[
            "backtrace::backtrace::trace",
            "execute::caller::CallerInfo::capture",
            "tool::main",
            "app::main",
        ]);
        let caller = CallerInfo::from_frames(&stack).unwrap();
        assert_eq!(caller.component(), "tool");
        assert!(!caller.is_entry_point());
    }

    #[test]
    fn outermost_non_main_is_not_entry_point() {
        let stack = frames(&["backtrace::trace", "app::worker::{{closure}}"]);
        let caller = CallerInfo::from_frames(&stack).unwrap();
        assert_eq!(caller.component(), "app::worker");
        assert_eq!(caller.operation(), "{{closure}}");
        assert!(!caller.is_entry_point());
    }

    #[test]
    fn similarly_named_crates_are_not_skipped() {
        let stack = frames(&["backtrace::trace", "backtrace_ext::show", "app::main"]);
        let caller = CallerInfo::from_frames(&stack).unwrap();
        assert_eq!(caller.component(), "backtrace_ext");
    }

    #[test]
    fn first_frame_must_be_the_capture() {
        let stack = frames(&["app::helper", "app::main"]);
        match CallerInfo::from_frames(&stack) {
            Err(Error::Internal { message }) => assert!(message.contains("app::helper")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(CallerInfo::from_frames(&[]).is_err());

        let inlined = frames(&["execute::caller::CallerInfo::capture", "app::main"]);
        assert!(CallerInfo::from_frames(&inlined).unwrap().is_entry_point());
    }

    #[test]
    fn missing_caller_is_internal_error() {
        let stack = frames(&["backtrace::trace", "execute::runner::run"]);
        match CallerInfo::from_frames(&stack) {
            Err(Error::Internal { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn trims_runtime_frames() {
        let stack = trim_runtime(frames(&[
            "backtrace::trace",
            "app::main",
            "core::ops::function::FnOnce::call_once",
            "std::sys::backtrace::__rust_begin_short_backtrace",
            "std::rt::lang_start::{{closure}}",
            "main",
        ]));
        assert_eq!(stack.last(), Some(&Frame::new("app", "main")));
        assert!(CallerInfo::from_frames(&stack).unwrap().is_entry_point());
    }
}

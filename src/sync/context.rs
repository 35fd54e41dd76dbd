use crate::buffer::{BufferError, LineBuffer};
use crate::model::line::Viewport;
use crate::model::task::{Priority, StoreTask};
use crate::parse::{parse_project_line, parse_viewport};

/// Defaults a new task inherits from the heading it sits under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionContext {
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub priority: Option<Priority>,
}

impl SectionContext {
    pub fn from_project(name: &str) -> Self {
        SectionContext {
            project: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Read `project:`, `+tag` and `pri:` tokens from the filter, then let
    /// the explicit defaults override them.
    pub fn from_viewport(viewport: &Viewport) -> Self {
        let mut context = SectionContext::default();
        context.absorb(&viewport.filter);
        if let Some(ref defaults) = viewport.defaults {
            context.absorb(defaults);
        }
        context
    }

    fn absorb(&mut self, tokens: &str) {
        for token in tokens.split_whitespace() {
            if let Some(tag) = token.strip_prefix('+') {
                if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
                    self.tags.push(tag.to_string());
                }
                continue;
            }
            let Some((key, value)) = token.split_once(':') else {
                continue;
            };
            match key {
                "project" | "pro" | "proj" if !value.is_empty() => {
                    self.project = Some(value.to_string());
                }
                "priority" | "pri" => {
                    if let Some(priority) = Priority::from_letter(value) {
                        self.priority = Some(priority);
                    }
                }
                _ => {}
            }
        }
    }

    /// Fill a fresh task from the section defaults
    pub fn apply(&self, task: &mut StoreTask) {
        if task.project.is_none() {
            task.project = self.project.clone();
        }
        for tag in &self.tags {
            if !task.tags.contains(tag) {
                task.tags.push(tag.clone());
            }
        }
        if task.priority.is_none() {
            task.priority = self.priority;
        }
    }
}

/// Find the context for `line`: the nearest project declaration or viewport
/// heading above it. Lines before any heading get an empty context.
pub fn section_context<B: LineBuffer + ?Sized>(
    buffer: &B,
    line: usize,
) -> Result<SectionContext, BufferError> {
    for idx in (0..line).rev() {
        let text = buffer.read_line(idx)?;
        if let Some(project) = parse_project_line(&text) {
            return Ok(SectionContext::from_project(&project));
        }
        if let Some(viewport) = parse_viewport(&text) {
            return Ok(SectionContext::from_viewport(&viewport));
        }
    }
    Ok(SectionContext::default())
}

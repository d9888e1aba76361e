use crate::client::ChatBackend;
use crate::models::{ModelDescriptor, Result};
use crate::renderer::{Align, Table};
use colored::*;
use rustyline::{error::ReadlineError, DefaultEditor};

/// Startup requires a model; later reselection may be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerMode {
    Required,
    Optional,
}

/// The model list with one optionally highlighted entry.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    models: Vec<ModelDescriptor>,
    highlighted: Option<usize>,
    current: Option<String>,
}

impl ModelSelection {
    pub fn new(models: Vec<ModelDescriptor>, current: Option<&str>) -> Self {
        let highlighted = current.and_then(|name| models.iter().position(|m| m.name == name));
        Self {
            models,
            highlighted,
            current: current.map(str::to_string),
        }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlight(&mut self, index: usize) -> bool {
        if index < self.models.len() {
            self.highlighted = Some(index);
            true
        } else {
            false
        }
    }

    /// The highlighted model's name, or the previous model if nothing is highlighted.
    pub fn confirm(&self) -> Option<String> {
        self.highlighted
            .and_then(|i| self.models.get(i))
            .map(|m| m.name.clone())
            .or_else(|| self.current.clone())
    }

    pub fn render(&self, width: usize) -> String {
        let mut table = Table::new(vec![
            ("", Align::Left),
            ("#", Align::Right),
            ("Name", Align::Left),
            ("Model", Align::Left),
            ("Size", Align::Right),
            ("Last Modified", Align::Left),
        ]);
        for (i, model) in self.models.iter().enumerate() {
            let marker = if Some(i) == self.highlighted { "*" } else { "" };
            table.add_row(vec![
                marker.to_string(),
                (i + 1).to_string(),
                model.name.clone(),
                model.model.clone(),
                model.human_size(),
                model.modified_display(),
            ]);
        }
        table.fit_to_width(width);
        table.render()
    }
}

/// Lists the server's models and asks the user to choose one. `None` means
/// the user cancelled, or confirmed with nothing chosen.
pub async fn pick_model(
    editor: &mut DefaultEditor,
    backend: &dyn ChatBackend,
    current: Option<&str>,
    mode: PickerMode,
    width: usize,
) -> Result<Option<String>> {
    let models = backend.list_models().await?;
    let mut selection = ModelSelection::new(models, current);

    let title = match mode {
        PickerMode::Required => "Select Model",
        PickerMode::Optional => "Manage Models",
    };
    println!("{}", title.green().bold());
    if selection.models().is_empty() {
        println!("{}", "  The server has no models installed.".yellow());
        return Ok(selection.confirm());
    }
    print!("{}", selection.render(width));
    println!(
        "{}",
        "  Enter a number to choose, Enter to keep the marked model, `q` to cancel.".dimmed()
    );

    loop {
        let input = match editor.readline("model> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        if input.is_empty() {
            return Ok(selection.confirm());
        }
        match input.parse::<usize>() {
            Ok(n) if n >= 1 && selection.highlight(n - 1) => return Ok(selection.confirm()),
            _ => println!(
                "{}",
                format!("  Choose a number from 1 to {}.", selection.models().len()).red()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            model: name.to_string(),
            size: 4_000_000_000,
            modified_at: "2024-05-01T10:20:30Z".to_string(),
        }
    }

    fn models() -> Vec<ModelDescriptor> {
        vec![model("llama3:latest"), model("mistral:7b"), model("phi3:mini")]
    }

    #[test]
    fn preselects_active_model() {
        let selection = ModelSelection::new(models(), Some("mistral:7b"));
        assert_eq!(selection.highlighted(), Some(1));
        assert_eq!(selection.confirm().as_deref(), Some("mistral:7b"));
    }

    #[test]
    fn nothing_highlighted_keeps_previous_model() {
        let selection = ModelSelection::new(models(), Some("removed:model"));
        assert_eq!(selection.highlighted(), None);
        assert_eq!(selection.confirm().as_deref(), Some("removed:model"));

        let initial = ModelSelection::new(models(), None);
        assert_eq!(initial.confirm(), None);
    }

    #[test]
    fn highlighting_changes_choice() {
        let mut selection = ModelSelection::new(models(), Some("llama3:latest"));
        assert!(selection.highlight(2));
        assert!(!selection.highlight(3));
        assert_eq!(selection.confirm().as_deref(), Some("phi3:mini"));
    }

    #[test]
    fn render_marks_highlighted_row() {
        let selection = ModelSelection::new(models(), Some("phi3:mini"));
        let rendered = selection.render(120);
        let marked: Vec<&str> = rendered.lines().filter(|l| l.contains("│ * │")).collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].contains("phi3:mini"));
        assert!(marked[0].contains("4.0 GB"));
        assert!(marked[0].contains("2024-05-01 10:20"));
    }
}

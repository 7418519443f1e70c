/// Ordered accumulator of rendered metric lines.
#[derive(Debug, Default, Clone)]
pub struct MetricBuilder {
    lines: Vec<String>,
}

impl MetricBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_metric(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Push a `name,value[,dimension]` line.
    pub fn add_observation(&mut self, name: &str, value: impl std::fmt::Display, dimension: Option<&str>) {
        match dimension {
            Some(dim) => self.lines.push(format!("{name},{value},{dim}")),
            None => self.lines.push(format!("{name},{value}")),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Join every line with `delim`. No leading or trailing delimiter.
    pub fn render(&self, delim: &str) -> String {
        self.lines.join(delim)
    }
}

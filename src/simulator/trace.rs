use super::Tristate;

/// Named waveform rows, one glyph per snapshot
#[derive(Clone, Debug, Default)]
pub struct Trace {
    rows: Vec<(String, String)>,
}

impl Trace {
    pub fn new(names: &[&str]) -> Self {
        Trace {
            rows: names
                .iter()
                .map(|&name| (name.to_owned(), String::new()))
                .collect(),
        }
    }

    /// Appends one column. `values` is in row order; missing values leave a gap.
    pub fn record(&mut self, values: &[Tristate]) {
        for (index, (_, out)) in self.rows.iter_mut().enumerate() {
            out.push(values.get(index).map_or(' ', |v| v.glyph()));
        }
    }

    /// Number of recorded columns
    pub fn len(&self) -> usize {
        self.rows.first().map_or(0, |(_, out)| out.chars().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, name: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, out)| out.as_str())
    }

    pub fn render(&self) -> String {
        let pad = self.rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0) + 1;
        let mut s = String::new();

        for (name, out) in &self.rows {
            s.push_str(&format!("{name:pad$}{out}\n", name = name, pad = pad, out = out));
        }

        s
    }

    pub fn show(&self) {
        if self.rows.is_empty() {
            println!("(no traced signals)");
            return;
        }

        print!("{}", self.render());
    }

    pub fn clear(&mut self) {
        for (_, out) in &mut self.rows {
            out.clear();
        }
    }
}

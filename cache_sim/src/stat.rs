use std::fmt;

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> &'static str;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
    pub fn len(&self) -> usize {
        self.stats.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
    pub fn view(&self, max_width: usize) -> StatAllView<'_> {
        StatAllView {
            views: self.stats.iter().map(|s| s.view(max_width)).collect(),
            max_width,
        }
    }
}

pub struct StatAllView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
    max_width: usize,
}

impl fmt::Display for StatAllView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .views
            .iter()
            .map(|s| s.header().len().max(s.width()))
            .max()
            .unwrap_or(0)
            .min(self.max_width);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            write!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl Stat for Fixed {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(FixedView(self.0))
        }
    }

    struct FixedView(&'static str);

    impl StatView for FixedView {
        fn header(&self) -> &'static str {
            "fixed"
        }
        fn width(&self) -> usize {
            self.0.len()
        }
    }

    impl fmt::Display for FixedView {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "{}", self.0)
        }
    }

    #[test]
    fn test_stats_view() {
        let mut ss = Stats::default();
        assert!(ss.is_empty());
        ss.push(Box::new(Fixed("  value: 1")));
        ss.push(Box::new(Fixed("  value: 2")));
        let s = format!("{}", ss.view(80));
        assert_eq!(
            s,
            " statistics \nfixed:\n  value: 1\nfixed:\n  value: 2\n----------"
        );
    }
    #[test]
    fn test_empty_stats_view() {
        let s = format!("{}", Stats::default().view(80));
        assert_eq!(s, " statistics \n");
    }
}

//! `Accept` header parsing.

/// A parsed `Accept` header: media ranges with their quality values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcceptHeader {
    ranges: Vec<(String, f32)>,
}

impl AcceptHeader {
    /// Parses `text/html;q=0.9, application/*`. Malformed quality values
    /// count as `1.0`; entries without a `/` are ignored.
    pub fn parse(raw: &str) -> Self {
        let ranges = raw
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let range = pieces.next()?.trim().to_ascii_lowercase();
                if !range.contains('/') {
                    return None;
                }
                let q = pieces
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0)
                    .clamp(0.0, 1.0);
                Some((range, q))
            })
            .collect();
        Self { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Quality the client assigns to `mime_type`, taking the most specific
    /// matching range. `None` when no range covers it.
    pub fn priority_of(&self, mime_type: &str) -> Option<f32> {
        self.best_range(mime_type).map(|(_, q)| q)
    }

    fn best_range(&self, mime_type: &str) -> Option<(usize, f32)> {
        let mime_type = mime_type.to_ascii_lowercase();
        let (kind, _) = mime_type.split_once('/')?;

        self.ranges.iter()
            .enumerate()
            .filter_map(|(idx, (range, q))| {
                let specificity = if *range == mime_type {
                    2
                } else if range.strip_suffix("/*") == Some(kind) {
                    1
                } else if range == "*/*" {
                    0
                } else {
                    return None;
                };
                Some((specificity, idx, *q))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, idx, q)| (idx, q))
    }

    /// The acceptable entry of `supported` the client prefers most.
    ///
    /// Higher quality wins; on equal quality the range listed earlier in the
    /// header wins, then the earlier supported type.
    pub fn find_match_with_greatest_priority(&self, supported: &[String]) -> Option<String> {
        let mut best: Option<(f32, usize, &String)> = None;
        for mime_type in supported {
            let Some((idx, q)) = self.best_range(mime_type) else { continue };
            if q <= 0.0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_q, best_idx, _)) => q > best_q || (q == best_q && idx < best_idx),
            };
            if better {
                best = Some((q, idx, mime_type));
            }
        }
        best.map(|(_, _, mime_type)| mime_type.clone())
    }
}

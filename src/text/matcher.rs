/*!
 * Approximate string matching.
 *
 * Ratcliff/Obershelp similarity over characters: the longest common block is
 * found, then the search recurses into the pieces left and right of it. The
 * ratio is `2 * M / (len(a) + len(b))` where `M` is the number of matched
 * characters. No junk heuristic is applied, so results only depend on the
 * two inputs.
 */

use std::collections::HashMap;

/// A run of `size` equal characters at `a[a_start..]` and `b[b_start..]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub size: usize,
}

/// Kind of edit described by an [`Opcode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// Turns `a[a_range]` into `b[b_range]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpcodeTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

/// Character sequence matcher
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    /// Positions of every character of `b`
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }
        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Ties are resolved towards the earliest block in `a`, then in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchBlock {
        let mut best = MatchBlock {
            a_start: alo,
            b_start: blo,
            size: 0,
        };
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let previous = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 };
                    let k = previous + 1;
                    new_j2len.insert(j, k);
                    if k > best.size {
                        best = MatchBlock {
                            a_start: i + 1 - k,
                            b_start: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            j2len = new_j2len;
        }

        best
    }

    /// Non-overlapping matching blocks in increasing order, ending with a
    /// zero-sized sentinel at `(len(a), len(b))`
    pub fn matching_blocks(&self) -> Vec<MatchBlock> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.size);
            blocks.push(block);
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort_by_key(|b| (b.a_start, b.b_start));

        // Collapse adjacent blocks
        let mut merged: Vec<MatchBlock> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last)
                    if last.a_start + last.size == block.a_start
                        && last.b_start + last.size == block.b_start =>
                {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }
        merged.push(MatchBlock {
            a_start: self.a.len(),
            b_start: self.b.len(),
            size: 0,
        });
        merged
    }

    /// Similarity in `[0, 1]`; two empty strings are identical
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|b| b.size).sum();
        2.0 * matches as f64 / total as f64
    }

    /// Edit script turning `a` into `b`
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut i = 0;
        let mut j = 0;
        let mut codes = Vec::new();

        for block in self.matching_blocks() {
            let tag = match (i < block.a_start, j < block.b_start) {
                (true, true) => Some(OpcodeTag::Replace),
                (true, false) => Some(OpcodeTag::Delete),
                (false, true) => Some(OpcodeTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                codes.push(Opcode {
                    tag,
                    a_start: i,
                    a_end: block.a_start,
                    b_start: j,
                    b_end: block.b_start,
                });
            }
            i = block.a_start + block.size;
            j = block.b_start + block.size;
            if block.size > 0 {
                codes.push(Opcode {
                    tag: OpcodeTag::Equal,
                    a_start: block.a_start,
                    a_end: i,
                    b_start: block.b_start,
                    b_end: j,
                });
            }
        }

        codes
    }

    fn a_slice(&self, start: usize, end: usize) -> String {
        self.a[start..end].iter().collect()
    }

    fn b_slice(&self, start: usize, end: usize) -> String {
        self.b[start..end].iter().collect()
    }
}

/// Similarity ratio of two strings
pub fn similarity(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}

/// Inline diff of `expected` against `actual`: `[-removed-]{+added+}`
pub fn render_diff(expected: &str, actual: &str) -> String {
    let matcher = SequenceMatcher::new(expected, actual);
    let mut out = String::new();

    for code in matcher.opcodes() {
        let removed = matcher.a_slice(code.a_start, code.a_end);
        let added = matcher.b_slice(code.b_start, code.b_end);
        match code.tag {
            OpcodeTag::Equal => out.push_str(&removed),
            OpcodeTag::Delete => out.push_str(&format!("[-{}-]", removed)),
            OpcodeTag::Insert => out.push_str(&format!("{{+{}+}}", added)),
            OpcodeTag::Replace => out.push_str(&format!("[-{}-]{{+{}+}}", removed, added)),
        }
    }

    out
}

//! UCI info command types.

use std::iter::Peekable;
use std::str::{FromStr, SplitWhitespace};

use serde::{Deserialize, Serialize};

use crate::UciError;

/// Score in centipawns or mate distance, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

/// Whether a reported score is exact or only a search window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoreBound {
    #[default]
    Exact,
    Lower,
    Upper,
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Rank of this line when the engine runs with MultiPV (1 = best).
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// `lowerbound` / `upperbound` marker following the score.
    pub bound: ScoreBound,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Current move being searched.
    pub currmove: Option<String>,
    /// Current move number.
    pub currmovenumber: Option<u32>,
    /// Hash table usage (per mille).
    pub hashfull: Option<u32>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when this line carries a complete, exact principal variation.
    pub fn is_exact_pv(&self) -> bool {
        self.depth.is_some()
            && self.score.is_some()
            && self.bound == ScoreBound::Exact
            && !self.pv.is_empty()
    }

    /// Format as the engine would print it.
    pub fn to_uci(&self) -> String {
        let mut out = String::from("info");
        let mut field = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                out.push(' ');
                out.push_str(name);
                out.push(' ');
                out.push_str(&value);
            }
        };

        field("depth", self.depth.map(|d| d.to_string()));
        field("seldepth", self.seldepth.map(|d| d.to_string()));
        field("multipv", self.multipv.map(|m| m.to_string()));
        field(
            "score",
            self.score.map(|score| {
                let bound = match self.bound {
                    ScoreBound::Exact => "",
                    ScoreBound::Lower => " lowerbound",
                    ScoreBound::Upper => " upperbound",
                };
                match score {
                    Score::Cp(cp) => format!("cp {cp}{bound}"),
                    Score::Mate(n) => format!("mate {n}{bound}"),
                }
            }),
        );
        field("nodes", self.nodes.map(|n| n.to_string()));
        field("nps", self.nps.map(|n| n.to_string()));
        field("hashfull", self.hashfull.map(|h| h.to_string()));
        field("time", self.time.map(|t| t.to_string()));
        field("currmove", self.currmove.clone());
        field("currmovenumber", self.currmovenumber.map(|n| n.to_string()));
        field("pv", (!self.pv.is_empty()).then(|| self.pv.join(" ")));
        field("string", self.string.clone());

        out
    }

    /// Parse one `info` line.
    ///
    /// Returns `None` if the line is not an `info` line. Unparseable values
    /// are left unset rather than failing the whole line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        while let Some(token) = tokens.next() {
            match token {
                "depth" => info.depth = value(&mut tokens),
                "seldepth" => info.seldepth = value(&mut tokens),
                "multipv" => info.multipv = value(&mut tokens),
                "score" => {
                    let kind = tokens.next_if(|t| matches!(*t, "cp" | "mate"));
                    info.score = match (kind, value(&mut tokens)) {
                        (Some("cp"), Some(cp)) => Some(Score::Cp(cp)),
                        (Some("mate"), Some(n)) => Some(Score::Mate(n)),
                        _ => None,
                    };
                }
                "lowerbound" => info.bound = ScoreBound::Lower,
                "upperbound" => info.bound = ScoreBound::Upper,
                "nodes" => info.nodes = value(&mut tokens),
                "nps" => info.nps = value(&mut tokens),
                "time" => info.time = value(&mut tokens),
                "hashfull" => info.hashfull = value(&mut tokens),
                "currmovenumber" => info.currmovenumber = value(&mut tokens),
                "currmove" => info.currmove = tokens.next_if(|t| !is_info_keyword(t)).map(str::to_string),
                "pv" => {
                    while let Some(mv) = tokens.next_if(|t| !is_info_keyword(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    info.string = Some(tokens.by_ref().collect::<Vec<_>>().join(" "));
                }
                _ => {}
            }
        }

        Some(info)
    }
}

impl FromStr for EngineInfo {
    type Err = UciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UciError::ParseError(format!("not an info line: {s}")))
    }
}

/// Next token parsed as a value, unless it starts another field.
fn value<T: FromStr>(tokens: &mut Peekable<SplitWhitespace<'_>>) -> Option<T> {
    tokens.next_if(|t| !is_info_keyword(t)).and_then(|t| t.parse().ok())
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth" | "seldepth" | "multipv" | "score" | "lowerbound" | "upperbound"
        | "nodes" | "nps" | "time" | "pv" | "currmove" | "currmovenumber"
        | "hashfull" | "tbhits" | "string"
    )
}

/// Builder for constructing EngineInfo.
#[derive(Default)]
pub struct InfoBuilder {
    info: EngineInfo,
}

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, d: u32) -> Self {
        self.info.depth = Some(d);
        self.info.seldepth.get_or_insert(d);
        self
    }

    pub fn multipv(mut self, rank: u32) -> Self {
        self.info.multipv = Some(rank);
        self
    }

    pub fn score_cp(mut self, cp: i32) -> Self {
        self.info.score = Some(Score::Cp(cp));
        self
    }

    pub fn score_mate(mut self, moves: i32) -> Self {
        self.info.score = Some(Score::Mate(moves));
        self
    }

    pub fn bound(mut self, bound: ScoreBound) -> Self {
        self.info.bound = bound;
        self
    }

    pub fn nodes(mut self, nodes: u64, nps: u64) -> Self {
        self.info.nodes = Some(nodes);
        self.info.nps = Some(nps);
        self
    }

    pub fn pv<S: AsRef<str>>(mut self, moves: &[S]) -> Self {
        self.info.pv = moves.iter().map(|m| m.as_ref().to_string()).collect();
        self
    }

    pub fn build(self) -> EngineInfo {
        self.info
    }
}

/*! Parse textual assembly into guest programs.
 *
 * The `.pva` format lets programs live as version-controlled text: classes with fields and
 * methods, label-based branch targets, and handler declarations. `assemble` lowers parsed text
 * through the core program builder, so everything the builder validates (labels, branch targets,
 * duplicate definitions) is validated for assembled files too.
 */

use pest::Parser;
use pest_derive::Parser;
use std::path::Path;

mod lower;

pub use lower::{assemble, assemble_sources};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct PvaParser;

pub type ParseResult<T> = Result<T, Box<pest::error::Error<Rule>>>;

#[derive(thiserror::Error, Debug)]
pub enum AsmError {
    #[error("Parse error: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    #[error(transparent)]
    Program(#[from] provenir_core::ProgramError),
    #[error("Resolve error: {0}")]
    Resolve(String),
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn parse(input: &str) -> ParseResult<pest::iterators::Pairs<'_, Rule>> {
    PvaParser::parse(Rule::program, input).map_err(Box::new)
}

pub fn check(input: &str) -> bool {
    parse(input).is_ok()
}

/// Assembles every `.pva` file under `root` into one program.
pub fn load_dir<P: AsRef<Path>>(root: P) -> Result<provenir_core::Program, AsmError> {
    let mut sources = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| AsmError::Resolve(e.to_string()))?;
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == "pva")
        {
            sources.push(std::fs::read_to_string(entry.path())?);
        }
    }
    let refs: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    assemble_sources(&refs)
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<provenir_core::Program, AsmError> {
    let source = std::fs::read_to_string(path)?;
    assemble(&source)
}

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "rvasm.pest"]
pub struct RvParser;

// starc — Star code assembler
//
// Library root. The netlist front end (lexer, parser, ast) feeds graph
// construction; code generation drives every star through its lifecycle
// and assembles the resolved fragments into one C program.

pub mod ast;
pub mod codeblock;
pub mod codegen;
pub mod descriptor;
pub mod diag;
pub mod dot;
pub mod graph;
pub mod id;
pub mod lexer;
pub mod library;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod precision;
pub mod resolve;
pub mod stars;
pub mod symbols;
pub mod template;
pub mod types;

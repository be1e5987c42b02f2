use clap::{Parser, ValueEnum};
use clap_num::maybe_hex;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum Index {
    #[default]
    Tree,
    List,
}

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
pub enum Command {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser=maybe_hex::<usize>)]
        size: usize,
        #[arg(long, value_parser=maybe_hex::<usize>)]
        align: usize,
        #[arg(long, default_value = "tree")]
        index: Index,
    },
    Delete {
        #[arg(long)]
        arena: String,
    },
    Alloc {
        #[arg(long)]
        arena: String,
        #[arg(long, value_parser=maybe_hex::<usize>)]
        size: usize,
    },
    Free {
        #[arg(long)]
        arena: String,
        #[arg(long, value_parser=maybe_hex::<usize>)]
        base: usize,
    },
    Print {
        #[arg(long)]
        arena: Option<String>,
    },

    Exit,
}

//! An interactive shell for poking at arenas by hand.
//!
//! ```text
//! [∴] create --name heap --size 0x200 --align 0x10
//! [∴] alloc --arena heap --size 5
//! [∴] print
//! ```

use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::Debug,
};

use bfcarena::{Bfc, Error, LinearBfc};
use clap::Parser;
use linefeed::{Interface, ReadResult};

use crate::parsing::{Command, Index};

mod parsing;

/// Either flavor of arena, so both can live in one table.
enum AnyArena {
    Tree(Bfc<'static>),
    List(LinearBfc<'static>),
}
impl AnyArena {
    fn alloc(&mut self, size: usize) -> bfcarena::Result<usize> {
        match self {
            Self::Tree(arena) => arena.alloc(size),
            Self::List(arena) => arena.alloc(size),
        }
    }

    fn free(&mut self, base: usize) -> bfcarena::Result<()> {
        match self {
            Self::Tree(arena) => arena.free(base),
            Self::List(arena) => arena.free(base),
        }
    }

    fn allocation_size(&self, base: usize) -> Option<usize> {
        match self {
            Self::Tree(arena) => arena.allocation_size(base),
            Self::List(arena) => arena.allocation_size(base),
        }
    }
}
impl Debug for AnyArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(arena) => Debug::fmt(arena, f),
            Self::List(arena) => Debug::fmt(arena, f),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let interface = Interface::new("bfc-repl")?;
    interface.set_prompt("[∴] ")?;

    let mut arenas: HashMap<String, AnyArena> = HashMap::new();

    while let ReadResult::Input(command) = interface.read_line()? {
        match Command::try_parse_from(["[∴]"].into_iter().chain(command.split(' '))) {
            Ok(Command::Exit) => break,
            Ok(Command::Create {
                name,
                size,
                align,
                index,
            }) => match arenas.entry(name.clone()) {
                Entry::Vacant(entry) => {
                    let label: &'static str = name.leak();
                    let arena = match index {
                        Index::Tree => Bfc::create(label, size, align).map(AnyArena::Tree),
                        Index::List => LinearBfc::create(label, size, align).map(AnyArena::List),
                    };
                    match arena {
                        Ok(arena) => {
                            println!(
                                "Created arena {label:?} of {:#x} with alignment {align:#x}",
                                size - size % align
                            );
                            entry.insert(arena);
                        }
                        Err(Error::InvalidAlignment) => {
                            println!("The alignment must not be zero!");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Entry::Occupied(_) => {
                    println!("There is already an arena named {name:?}");
                }
            },
            Ok(Command::Print { arena: None }) => {
                if !arenas.is_empty() {
                    println!();
                    for arena in arenas.values() {
                        println!("{:?}", arena);
                    }
                } else {
                    println!("There are no arenas to print!");
                }
            }
            Ok(Command::Print { arena: Some(arena) }) => {
                match arenas.get(&arena) {
                    Some(arena) => println!("\n{:?}", arena),
                    None => {
                        println!("There is no arena named {arena:?} :(");
                    }
                };
            }
            Ok(Command::Alloc { arena, size }) => {
                match arenas.get_mut(&arena) {
                    Some(arena) => match arena.alloc(size) {
                        Ok(base) => {
                            let reserved = arena.allocation_size(base).unwrap_or(size);
                            println!("Allocated {reserved:#x} bytes at {base:#x}");
                        }
                        Err(Error::OutOfMemory) => {
                            println!("There is no free chunk of {size:#x} bytes!");
                        }
                        Err(e) => return Err(e.into()),
                    },
                    None => {
                        println!("There is no arena named {arena:?} :(");
                    }
                };
            }
            Ok(Command::Free { arena, base }) => {
                match arenas.get_mut(&arena) {
                    Some(arena) => match arena.free(base) {
                        Ok(_) => println!("Freed {:#x}", base),
                        Err(Error::NoSuchAllocation) => {
                            println!("There is no allocation at {:#x}", base)
                        }
                        Err(e) => return Err(e.into()),
                    },
                    None => {
                        println!("There is no arena named {arena:?} :(");
                    }
                };
            }
            Ok(Command::Delete { arena: name }) => {
                match arenas.remove(&name) {
                    Some(_) => {
                        println!("Deleted arena {:?}!", name);
                    }
                    None => {
                        println!("There is no arena named {name:?} :(");
                    }
                };
            }
            Err(err) => {
                println!();
                err.print()?;
                println!();
                continue;
            }
        }
    }

    Ok(())
}

//! Maya particle ASCII files (`.pda`)
//!
//! ```text
//! ATTRIBUTES
//!  position mass id
//! TYPES
//!  V R I
//! NUMBER_OF_PARTICLES: 2
//! BEGIN DATA
//! 0 0 0 1 7
//! 1 0 0 2 8
//! ```

use std::io::{Read, Write};

use log::warn;
use partio_data::{AttributeType, ParticleAttribute, Particles};

use super::text::Tokens;
use super::{add_channel, new_container};
use crate::error::{Error, Result};
use crate::format::ParticleCodec;

const FORMAT: &str = "PDA";

/// Type letter used for `attr`, if it can be stored
fn type_letter(attr: &ParticleAttribute) -> Option<&'static str> {
    match (attr.attr_type, attr.count) {
        (AttributeType::Vector, 3) => Some("V"),
        (AttributeType::Float, 1) => Some("R"),
        (AttributeType::Int, 1) => Some("I"),
        _ => None,
    }
}

/// A column of the data section
enum Column {
    Attribute(ParticleAttribute),
    /// Consumed and discarded
    Ignored,
}

/// Maya particle ASCII codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PdaCodec;

impl ParticleCodec for PdaCodec {
    const NAME: &'static str = FORMAT;
    const EXTENSION: &'static str = "pda";

    fn read<R: Read>(input: R, headers_only: bool) -> Result<Particles> {
        let mut tokens = Tokens::read(input, &[], FORMAT)?;
        tokens.expect("ATTRIBUTES")?;

        let mut names = Vec::new();
        loop {
            let token = tokens.token()?;
            if token == "TYPES" {
                break;
            }
            names.push(token.to_owned());
        }

        let mut particles = new_container(headers_only);
        let mut columns = Vec::new();
        let mut index = 0;
        loop {
            let token = tokens.token()?;
            if token == "NUMBER_OF_PARTICLES:" {
                break;
            }
            let Some(name) = names.get(index) else {
                continue;
            };
            index += 1;
            let (attr_type, count) = match token {
                "V" => (AttributeType::Vector, 3),
                "R" => (AttributeType::Float, 1),
                "I" => (AttributeType::Int, 1),
                other => {
                    warn!("{FORMAT}: skipping '{name}' of unknown type '{other}'");
                    columns.push(Column::Ignored);
                    continue;
                }
            };
            let token = token.to_owned();
            match add_channel(&mut particles, FORMAT, name, attr_type, count)? {
                Some(attr) => columns.push(Column::Attribute(attr)),
                None => {
                    // keep the column widths aligned with the declared type
                    let width = if token == "V" { 3 } else { 1 };
                    columns.extend((0..width).map(|_| Column::Ignored));
                }
            }
        }

        let count: usize = tokens.parse()?;
        if headers_only {
            drop(particles.try_add_particles(count)?);
            return Ok(particles);
        }
        tokens.expect("BEGIN")?;
        tokens.expect("DATA")?;

        let per_particle: usize = columns
            .iter()
            .map(|column| match column {
                Column::Ignored => 1,
                Column::Attribute(attr) => attr.count,
            })
            .sum();
        if count.saturating_mul(per_particle) > tokens.max_remaining() {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: {count} particles do not fit in the remaining data"
            )));
        }
        drop(particles.try_add_particles(count)?);

        for index in 0..count {
            for column in &columns {
                match column {
                    Column::Ignored => {
                        tokens.token()?;
                    }
                    Column::Attribute(attr) if attr.attr_type == AttributeType::Int => {
                        for slot in 0..attr.count {
                            let value: i32 = tokens.parse()?;
                            particles.data_write::<i32>(attr, index)[slot] = value;
                        }
                    }
                    Column::Attribute(attr) => {
                        for slot in 0..attr.count {
                            let value: f32 = tokens.parse()?;
                            particles.data_write::<f32>(attr, index)[slot] = value;
                        }
                    }
                }
            }
        }
        if tokens.peek().is_some() {
            return Err(Error::invalid_format(format!(
                "{FORMAT}: unexpected data after {count} particles"
            )));
        }
        Ok(particles)
    }

    fn write<W: Write>(mut output: W, particles: &Particles) -> Result<()> {
        let mut columns = Vec::new();
        for attr in particles.attributes() {
            match type_letter(attr) {
                Some(letter) => columns.push((attr, letter)),
                None => warn!(
                    "{FORMAT}: cannot store {}[{}] attribute '{}'",
                    attr.attr_type, attr.count, attr.name
                ),
            }
        }

        writeln!(output, "ATTRIBUTES")?;
        for (attr, _) in &columns {
            write!(output, " {}", attr.name)?;
        }
        writeln!(output)?;
        writeln!(output, "TYPES")?;
        for (_, letter) in &columns {
            write!(output, " {letter}")?;
        }
        writeln!(output)?;
        writeln!(output, "NUMBER_OF_PARTICLES: {}", particles.num_particles())?;
        writeln!(output, "BEGIN DATA")?;

        for index in 0..particles.num_particles() {
            let mut first = true;
            for (attr, _) in &columns {
                if attr.attr_type == AttributeType::Int {
                    for value in particles.data::<i32>(attr, index) {
                        write!(output, "{}{value}", if first { "" } else { " " })?;
                        first = false;
                    }
                } else {
                    for value in particles.data::<f32>(attr, index) {
                        write!(output, "{}{value}", if first { "" } else { " " })?;
                        first = false;
                    }
                }
            }
            writeln!(output)?;
        }
        Ok(())
    }
}

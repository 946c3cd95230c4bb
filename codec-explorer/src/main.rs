//! Decode a single glyph program and print the resulting outline.
//!
//! The input file holds one charstring or one `glyf` record, either as raw
//! bytes or, with `--hex`, as hexadecimal text. With `--reencode` the
//! decoded glyph is written back out in the same format and the bytes are
//! printed alongside the original ones.

use std::{fmt::Display, str::FromStr};

use glyph_codec::{
    postscript::{
        decode_charstring, decrypt_charstring, encode_charstring, encrypt_charstring,
        CffContext, CharstringVersion, EncodeOptions, PrivateDict,
    },
    truetype::{decode_glyph, GlyfEncoder},
    types::GlyphId16,
    Decoded, Glyph,
};

mod print;

use print::Printer;

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = flags::Args::from_env().map_err(Error::new)?;
    let bytes = std::fs::read(&args.input)
        .map_err(|e| Error(format!("failed to read '{}': {e}", args.input.display())))?;
    let data = if args.hex {
        parse_hex(&bytes)?
    } else {
        bytes
    };

    let private = PrivateDict::default();
    let mut printer = Printer::new();
    match args.format {
        Format::Glyf => {
            let decoded = decode_glyph(&data);
            print_decoded(&mut printer, &decoded)?;
            if args.reencode {
                // referenced glyphs are not available, so composites only
                // re-encode when they can be written without them
                let source: Vec<Glyph> = Vec::new();
                let result =
                    GlyfEncoder::default().encode(GlyphId16::new(0), &decoded.glyph, &source);
                print_reencoded(&mut printer, &data, result)?;
            }
        }
        Format::Charstring(version) => {
            let ctx = CffContext::new(version, &private);
            let decrypt = args.decrypt && version == CharstringVersion::Type1;
            let program = if decrypt {
                decrypt_charstring(&data, private.len_iv())
            } else {
                data.clone()
            };
            let decoded = decode_charstring(&program, &ctx);
            print_decoded(&mut printer, &decoded)?;
            if args.reencode {
                let result = encode_charstring(&decoded.glyph, &ctx, &EncodeOptions::default())
                    .map(|bytes| {
                        if decrypt {
                            encrypt_charstring(&bytes, private.len_iv())
                        } else {
                            bytes
                        }
                    });
                print_reencoded(&mut printer, &data, result)?;
            }
        }
    }
    Ok(())
}

fn print_decoded<E: Display>(
    printer: &mut Printer,
    decoded: &Decoded<Glyph, E>,
) -> Result<(), Error> {
    printer.print_glyph(&decoded.glyph).map_err(Error::new)?;
    for diagnostic in &decoded.diagnostics {
        printer.print_error(diagnostic).map_err(Error::new)?;
    }
    Ok(())
}

fn print_reencoded<E: Display>(
    printer: &mut Printer,
    original: &[u8],
    result: Result<Vec<u8>, E>,
) -> Result<(), Error> {
    match result {
        Ok(bytes) => printer
            .print_bytes(original, &bytes)
            .map_err(Error::new),
        Err(e) => printer
            .print_error(format!("re-encoding failed: {e}"))
            .map_err(Error::new),
    }
}

/// Parses hex text, ignoring whitespace.
fn parse_hex(text: &[u8]) -> Result<Vec<u8>, Error> {
    let digits = text
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| match (*b as char).to_digit(16) {
            Some(digit) => Ok(digit as u8),
            None => Err(Error(format!(
                "invalid hex digit '{}'",
                (*b as char).escape_default()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(Error::new("hex input has an odd number of digits"));
    }
    Ok(digits
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

/// The kind of glyph program in the input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Charstring(CharstringVersion),
    Glyf,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "type1" | "t1" => Ok(Format::Charstring(CharstringVersion::Type1)),
            "type2" | "cff" => Ok(Format::Charstring(CharstringVersion::Type2)),
            "cff2" => Ok(Format::Charstring(CharstringVersion::Cff2)),
            "glyf" | "truetype" => Ok(Format::Glyf),
            _ => Err(format!(
                "unknown format '{}', expected one of type1, type2, cff2, glyf",
                s.escape_default()
            )),
        }
    }
}

#[derive(Debug, Clone)]
struct Error(String);

impl Error {
    fn new(t: impl std::fmt::Display) -> Self {
        Self(t.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for Error {}

mod flags {
    use super::Format;
    use std::path::PathBuf;

    xflags::xflags! {
        /// Decode a glyph program and print its outline
        cmd args {
                required input: PathBuf
                /// One of type1, type2, cff2 or glyf
                required -f, --format format: Format
                /// The input is hexadecimal text
                optional --hex
                /// Type1 input is encrypted
                optional -d, --decrypt
                /// Encode the decoded glyph again and print the bytes
                optional -r, --reencode
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_input() {
        assert_eq!(parse_hex(b"ef 8b15\nbd 06 0e").unwrap(), [239, 139, 21, 189, 6, 14]);
        assert!(parse_hex(b"abc").is_err());
        assert!(parse_hex(b"zz").is_err());
    }

    #[test]
    fn format_names() {
        assert_eq!(
            "CFF2".parse::<Format>(),
            Ok(Format::Charstring(CharstringVersion::Cff2))
        );
        assert_eq!("glyf".parse::<Format>(), Ok(Format::Glyf));
        assert!("svg".parse::<Format>().is_err());
    }
}

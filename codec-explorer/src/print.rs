//! printing decoded glyphs

use std::{fmt::Display, io::Write};

use ansi_term::{Color, Style};
use glyph_codec::{model::RefTarget, types::Pen, Glyph, StemList};

// number of bytes on each line of a hex dump
const BYTES_PER_LINE: usize = 16;

pub struct Printer {
    is_tty: bool,
    writer: std::io::Stdout,
}

impl Printer {
    pub fn new() -> Self {
        Printer {
            is_tty: atty::is(atty::Stream::Stdout),
            writer: std::io::stdout(),
        }
    }

    fn styled(&self, style: Style, text: impl Display) -> String {
        if self.is_tty {
            style.paint(text.to_string()).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&mut self, text: &str) -> std::io::Result<()> {
        let text = self.styled(Style::new().bold(), text);
        writeln!(self.writer, "{text}")
    }

    pub fn print_glyph(&mut self, glyph: &Glyph) -> std::io::Result<()> {
        self.heading(&format!("{:?} glyph", glyph.format))?;
        let bbox = glyph.bbox;
        writeln!(
            self.writer,
            "  advance {}  lsb {}  bbox [{} {} {} {}]",
            glyph.advance_width, glyph.lsb, bbox.x0, bbox.y0, bbox.x1, bbox.y1
        )?;
        if glyph.overlap_simple {
            writeln!(self.writer, "  overlapping contours")?;
        }

        if !glyph.hints.is_empty() {
            self.heading("hints")?;
            self.print_stems("h", &glyph.hints.h)?;
            self.print_stems("v", &glyph.hints.v)?;
            for mask in &glyph.counter_masks {
                let members: Vec<_> = mask.iter().map(|n| n.to_string()).collect();
                writeln!(self.writer, "  counter [{}]", members.join(" "))?;
            }
        }

        if !glyph.figures.iter().all(|f| f.is_empty()) {
            self.heading("contours")?;
            let mut pen = PathPrinter::default();
            glyph.draw(&mut pen);
            for contour in pen.contours {
                writeln!(self.writer, "  {}", contour.join(" "))?;
            }
        }

        if !glyph.refs.is_empty() {
            self.heading("components")?;
            for component in &glyph.refs {
                let target = match component.target {
                    RefTarget::Glyph(gid) => format!("glyph {gid}"),
                    RefTarget::StandardCode(code) => format!("standard code {code}"),
                };
                let [xx, yx, xy, yy, dx, dy] = component.transform.as_coeffs();
                write!(
                    self.writer,
                    "  {target} [{xx} {yx} {xy} {yy} {dx} {dy}]"
                )?;
                if let Some(anchor) = component.point_match {
                    write!(
                        self.writer,
                        " matching {} to {}",
                        anchor.component, anchor.base
                    )?;
                }
                writeln!(self.writer, " {:?}", component.flags)?;
            }
        }

        if !glyph.instructions.is_empty() {
            self.heading(&format!("instructions ({} bytes)", glyph.instructions.len()))?;
            self.print_hex(&glyph.instructions)?;
        }
        Ok(())
    }

    fn print_stems(&mut self, direction: &str, stems: &StemList) -> std::io::Result<()> {
        for stem in stems.iter() {
            writeln!(
                self.writer,
                "  {direction}stem #{} {} {}",
                stem.hint_number, stem.start, stem.width
            )?;
        }
        Ok(())
    }

    pub fn print_error(&mut self, error: impl Display) -> std::io::Result<()> {
        let label = self.styled(Color::Red.bold(), "error");
        writeln!(self.writer, "{label}: {error}")
    }

    /// Prints the re-encoded bytes, marking whether they match the input.
    pub fn print_bytes(&mut self, original: &[u8], encoded: &[u8]) -> std::io::Result<()> {
        let status = if original == encoded {
            self.styled(Color::Green.normal(), "identical")
        } else {
            self.styled(Color::Yellow.normal(), "changed")
        };
        self.heading(&format!("re-encoded ({} bytes, {status})", encoded.len()))?;
        self.print_hex(encoded)
    }

    fn print_hex(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        for line in bytes.chunks(BYTES_PER_LINE) {
            let hex: Vec<_> = line.iter().map(|b| format!("{b:02X}")).collect();
            writeln!(self.writer, "  {}", hex.join(" "))?;
        }
        Ok(())
    }
}

/// Collects outline commands in SVG path notation, one list per contour.
#[derive(Default)]
struct PathPrinter {
    contours: Vec<Vec<String>>,
}

impl PathPrinter {
    fn push(&mut self, command: String) {
        match self.contours.last_mut() {
            Some(contour) => contour.push(command),
            None => self.contours.push(vec![command]),
        }
    }
}

impl Pen for PathPrinter {
    fn move_to(&mut self, x: f32, y: f32) {
        self.contours.push(vec![format!("M{x},{y}")]);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(format!("L{x},{y}"));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.push(format!("Q{cx0},{cy0} {x},{y}"));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.push(format!("C{cx0},{cy0} {cx1},{cy1} {x},{y}"));
    }

    fn close(&mut self) {
        self.push("Z".to_string());
    }
}

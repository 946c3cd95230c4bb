//! Charstring operators.

use super::CharstringVersion;
use crate::{data::Cursor, error::CharstringError};

/// Escape opcode for accessing two byte operators.
const ESCAPE: u8 = 12;

/// PostScript charstring operator.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2charstr#appendix-a-cff2-charstring-command-codes>
/// and "Appendix A" of the Type 1 font format specification.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Operator {
    HStem,
    VStem,
    VMoveTo,
    RLineTo,
    HLineTo,
    VLineTo,
    RrCurveTo,
    ClosePath,
    CallSubr,
    Return,
    Hsbw,
    EndChar,
    VariationStoreIndex,
    Blend,
    HStemHm,
    HintMask,
    CntrMask,
    RMoveTo,
    HMoveTo,
    VStemHm,
    RCurveLine,
    RLineCurve,
    VvCurveTo,
    HhCurveTo,
    CallGsubr,
    VhCurveTo,
    HvCurveTo,
    // escaped operators
    DotSection,
    VStem3,
    HStem3,
    And,
    Or,
    Not,
    Seac,
    Sbw,
    Abs,
    Add,
    Sub,
    Div,
    Neg,
    Eq,
    CallOtherSubr,
    Pop,
    Drop,
    Put,
    Get,
    IfElse,
    Random,
    Mul,
    Sqrt,
    Dup,
    Exch,
    Index,
    Roll,
    SetCurrentPoint,
    HFlex,
    Flex,
    HFlex1,
    Flex1,
}

/// Which charstring versions support an operator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Support {
    All,
    Type1Only,
    /// Type2 and CFF2.
    NotType1,
    Type2Only,
    Cff2Only,
    /// Type1 and Type2.
    NotCff2,
}

impl Operator {
    pub(crate) fn read(
        cursor: &mut Cursor,
        b0: u8,
        version: CharstringVersion,
    ) -> Result<Self, CharstringError> {
        let operator = if b0 == ESCAPE {
            let b1 = cursor
                .read::<u8>()
                .map_err(|_| CharstringError::UnexpectedEnd)?;
            Self::from_two_byte_opcode(b1).ok_or(CharstringError::InvalidEscapedOperator(b1))?
        } else {
            Self::from_opcode(b0).ok_or(CharstringError::InvalidOperator(b0))?
        };
        operator.check_version(version)?;
        Ok(operator)
    }

    /// Creates an operator from the given opcode.
    fn from_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            1 => HStem,
            3 => VStem,
            4 => VMoveTo,
            5 => RLineTo,
            6 => HLineTo,
            7 => VLineTo,
            8 => RrCurveTo,
            9 => ClosePath,
            10 => CallSubr,
            11 => Return,
            13 => Hsbw,
            14 => EndChar,
            15 => VariationStoreIndex,
            16 => Blend,
            18 => HStemHm,
            19 => HintMask,
            20 => CntrMask,
            21 => RMoveTo,
            22 => HMoveTo,
            23 => VStemHm,
            24 => RCurveLine,
            25 => RLineCurve,
            26 => VvCurveTo,
            27 => HhCurveTo,
            29 => CallGsubr,
            30 => VhCurveTo,
            31 => HvCurveTo,
            _ => return None,
        })
    }

    /// Creates an operator from the given extended opcode.
    ///
    /// These are preceded by a byte containing the escape value of 12.
    fn from_two_byte_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            0 => DotSection,
            1 => VStem3,
            2 => HStem3,
            3 => And,
            4 => Or,
            5 => Not,
            6 => Seac,
            7 => Sbw,
            9 => Abs,
            10 => Add,
            11 => Sub,
            12 => Div,
            14 => Neg,
            15 => Eq,
            16 => CallOtherSubr,
            17 => Pop,
            18 => Drop,
            20 => Put,
            21 => Get,
            22 => IfElse,
            23 => Random,
            24 => Mul,
            26 => Sqrt,
            27 => Dup,
            28 => Exch,
            29 => Index,
            30 => Roll,
            33 => SetCurrentPoint,
            34 => HFlex,
            35 => Flex,
            36 => HFlex1,
            37 => Flex1,
            _ => return None,
        })
    }

    /// Returns the encoded form of the operator.
    fn opcode(self) -> (bool, u8) {
        use Operator::*;
        match self {
            HStem => (false, 1),
            VStem => (false, 3),
            VMoveTo => (false, 4),
            RLineTo => (false, 5),
            HLineTo => (false, 6),
            VLineTo => (false, 7),
            RrCurveTo => (false, 8),
            ClosePath => (false, 9),
            CallSubr => (false, 10),
            Return => (false, 11),
            Hsbw => (false, 13),
            EndChar => (false, 14),
            VariationStoreIndex => (false, 15),
            Blend => (false, 16),
            HStemHm => (false, 18),
            HintMask => (false, 19),
            CntrMask => (false, 20),
            RMoveTo => (false, 21),
            HMoveTo => (false, 22),
            VStemHm => (false, 23),
            RCurveLine => (false, 24),
            RLineCurve => (false, 25),
            VvCurveTo => (false, 26),
            HhCurveTo => (false, 27),
            CallGsubr => (false, 29),
            VhCurveTo => (false, 30),
            HvCurveTo => (false, 31),
            DotSection => (true, 0),
            VStem3 => (true, 1),
            HStem3 => (true, 2),
            And => (true, 3),
            Or => (true, 4),
            Not => (true, 5),
            Seac => (true, 6),
            Sbw => (true, 7),
            Abs => (true, 9),
            Add => (true, 10),
            Sub => (true, 11),
            Div => (true, 12),
            Neg => (true, 14),
            Eq => (true, 15),
            CallOtherSubr => (true, 16),
            Pop => (true, 17),
            Drop => (true, 18),
            Put => (true, 20),
            Get => (true, 21),
            IfElse => (true, 22),
            Random => (true, 23),
            Mul => (true, 24),
            Sqrt => (true, 26),
            Dup => (true, 27),
            Exch => (true, 28),
            Index => (true, 29),
            Roll => (true, 30),
            SetCurrentPoint => (true, 33),
            HFlex => (true, 34),
            Flex => (true, 35),
            HFlex1 => (true, 36),
            Flex1 => (true, 37),
        }
    }

    pub(crate) fn write(self, out: &mut Vec<u8>) {
        match self.opcode() {
            (true, b1) => out.extend([ESCAPE, b1]),
            (false, b0) => out.push(b0),
        }
    }

    pub(crate) fn name(self) -> &'static str {
        use Operator::*;
        match self {
            HStem => "hstem",
            VStem => "vstem",
            VMoveTo => "vmoveto",
            RLineTo => "rlineto",
            HLineTo => "hlineto",
            VLineTo => "vlineto",
            RrCurveTo => "rrcurveto",
            ClosePath => "closepath",
            CallSubr => "callsubr",
            Return => "return",
            Hsbw => "hsbw",
            EndChar => "endchar",
            VariationStoreIndex => "vsindex",
            Blend => "blend",
            HStemHm => "hstemhm",
            HintMask => "hintmask",
            CntrMask => "cntrmask",
            RMoveTo => "rmoveto",
            HMoveTo => "hmoveto",
            VStemHm => "vstemhm",
            RCurveLine => "rcurveline",
            RLineCurve => "rlinecurve",
            VvCurveTo => "vvcurveto",
            HhCurveTo => "hhcurveto",
            CallGsubr => "callgsubr",
            VhCurveTo => "vhcurveto",
            HvCurveTo => "hvcurveto",
            DotSection => "dotsection",
            VStem3 => "vstem3",
            HStem3 => "hstem3",
            And => "and",
            Or => "or",
            Not => "not",
            Seac => "seac",
            Sbw => "sbw",
            Abs => "abs",
            Add => "add",
            Sub => "sub",
            Div => "div",
            Neg => "neg",
            Eq => "eq",
            CallOtherSubr => "callothersubr",
            Pop => "pop",
            Drop => "drop",
            Put => "put",
            Get => "get",
            IfElse => "ifelse",
            Random => "random",
            Mul => "mul",
            Sqrt => "sqrt",
            Dup => "dup",
            Exch => "exch",
            Index => "index",
            Roll => "roll",
            SetCurrentPoint => "setcurrentpoint",
            HFlex => "hflex",
            Flex => "flex",
            HFlex1 => "hflex1",
            Flex1 => "flex1",
        }
    }

    fn support(self) -> Support {
        use Operator::*;
        match self {
            HStem | VStem | VMoveTo | RLineTo | HLineTo | VLineTo | RrCurveTo | CallSubr
            | RMoveTo | HMoveTo | VhCurveTo | HvCurveTo | Div => Support::All,
            // tolerated outside of Type1 for fonts that emulate Type1 flex
            CallOtherSubr | Pop => Support::All,
            Return | EndChar => Support::NotCff2,
            ClosePath | Hsbw | VStem3 | HStem3 | Seac | Sbw | SetCurrentPoint => {
                Support::Type1Only
            }
            DotSection => Support::Type1Only,
            VariationStoreIndex | Blend => Support::Cff2Only,
            HStemHm | HintMask | CntrMask | VStemHm | RCurveLine | RLineCurve | VvCurveTo
            | HhCurveTo | CallGsubr | HFlex | Flex | HFlex1 | Flex1 => Support::NotType1,
            And | Or | Not | Abs | Add | Sub | Neg | Eq | Drop | Put | Get | IfElse | Random
            | Mul | Sqrt | Dup | Exch | Index | Roll => Support::Type2Only,
        }
    }

    fn check_version(self, version: CharstringVersion) -> Result<(), CharstringError> {
        use CharstringVersion::*;
        let supported = match self.support() {
            Support::All => true,
            Support::Type1Only => version == Type1,
            Support::NotType1 => version != Type1,
            Support::Type2Only => version == Type2,
            Support::Cff2Only => version == Cff2,
            Support::NotCff2 => version != Cff2,
        };
        if supported {
            Ok(())
        } else {
            Err(CharstringError::UnsupportedOperator {
                name: self.name(),
                version,
            })
        }
    }
}

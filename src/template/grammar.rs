use winnow::combinator::{alt, cut_err, delimited, opt, preceded};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::MatchOp;

use super::{ActionForm, RawAction, RawCondition};

// -- Whitespace & identifiers -----------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_whitespace())
        .void()
        .parse_next(input)
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// `field` or `binding.field`.
fn path<'i>(input: &mut &'i str) -> ModalResult<(Option<&'i str>, &'i str)> {
    let first = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "field name",
        )))
        .parse_next(input)?;
    let second = opt(preceded('.', cut_err(ident))).parse_next(input)?;
    Ok(match second {
        Some(field) => (Some(first), field),
        None => (None, first),
    })
}

/// The cell placeholder, quoted or bare.
fn param(input: &mut &str) -> ModalResult<()> {
    alt((delimited('"', "$param", '"'), "$param"))
        .void()
        .context(StrContext::Expected(StrContextValue::StringLiteral(
            "\"$param\"",
        )))
        .parse_next(input)
}

fn trailer(input: &mut &str) -> ModalResult<()> {
    ws.parse_next(input)?;
    opt(';').void().parse_next(input)?;
    ws.parse_next(input)
}

// -- Conditions -------------------------------------------------------------

fn match_op(input: &mut &str) -> ModalResult<MatchOp> {
    alt((
        "==".value(MatchOp::Eq),
        "!=".value(MatchOp::Neq),
        "matches".value(MatchOp::Matches),
    ))
    .parse_next(input)
}

pub(super) fn condition(input: &mut &str) -> ModalResult<RawCondition> {
    ws.parse_next(input)?;
    let (binding, field) = path.parse_next(input)?;
    ws.parse_next(input)?;
    let op = opt(match_op).parse_next(input)?;
    if op.is_some() {
        ws.parse_next(input)?;
        cut_err(param).parse_next(input)?;
    }
    trailer.parse_next(input)?;
    Ok(RawCondition {
        binding: binding.map(str::to_owned),
        field: field.to_owned(),
        op: op.unwrap_or(MatchOp::Eq),
    })
}

// -- Actions ----------------------------------------------------------------

pub(super) fn action(input: &mut &str) -> ModalResult<RawAction> {
    ws.parse_next(input)?;
    let (target, name) = path.parse_next(input)?;
    ws.parse_next(input)?;
    let form = opt(alt((
        delimited(('(', ws), cut_err(param), (ws, cut_err(')'))).value(ActionForm::Setter),
        preceded(('=', ws), cut_err(param)).value(ActionForm::Assign),
    )))
    .parse_next(input)?;
    trailer.parse_next(input)?;
    Ok(RawAction {
        target: target.map(str::to_owned),
        name: name.to_owned(),
        form: form.unwrap_or(ActionForm::Bare),
    })
}

//! Expression encoding inherited from the straight-line SMT pass.
//!
//! Produces the current symbolic value of a source expression against an
//! [`EncodingContext`]: identifier reads resolve to the variable's
//! current SSA term, assignments advance the target's index and assume
//! equality with the assigned value. Function calls are the rule
//! emitter's business and are rejected here; the emitter intercepts them
//! before delegating.

use sol_fv_smtlib::expr::Expr;

use crate::ast::{BinaryOperator, Expression, ExpressionKind, UnaryOperator, VarId};
use crate::context::EncodingContext;
use crate::error::ChcError;

/// Encode a call-free expression to its current symbolic value.
pub fn encode_expression(ctx: &mut EncodingContext, e: &Expression) -> Result<Expr, ChcError> {
    match &e.kind {
        ExpressionKind::BoolLiteral(b) => Ok(Expr::BoolLit(*b)),
        ExpressionKind::NumberLiteral(n) => Ok(Expr::IntLit(*n)),
        ExpressionKind::Identifier(id) => current_value(ctx, *id),
        ExpressionKind::Assignment { lhs, rhs } => {
            let value = encode_expression(ctx, rhs)?;
            assign(ctx, *lhs, value)
        }
        ExpressionKind::Binary { op, lhs, rhs } => {
            let l = encode_expression(ctx, lhs)?;
            let r = encode_expression(ctx, rhs)?;
            Ok(encode_binary(*op, l, r))
        }
        ExpressionKind::Unary { op, operand } => {
            let v = encode_expression(ctx, operand)?;
            Ok(match op {
                UnaryOperator::Not => Expr::not(v),
                UnaryOperator::Minus => Expr::neg(v),
            })
        }
        ExpressionKind::Call(call) => Err(ChcError::Unsupported(
            call.location,
            "function calls inside operator expressions are not supported".to_string(),
        )),
    }
}

/// Current SSA term of a registered variable.
pub fn current_value(ctx: &EncodingContext, id: VarId) -> Result<Expr, ChcError> {
    ctx.variable_by_id(id)
        .map(|v| v.current_value())
        .ok_or_else(|| ChcError::invariant(format!("read of unregistered variable {id}")))
}

/// Bind a fresh SSA instance of `lhs` to `value` and return it.
pub fn assign(ctx: &mut EncodingContext, lhs: VarId, value: Expr) -> Result<Expr, ChcError> {
    let var = ctx
        .variable_by_id_mut(lhs)
        .ok_or_else(|| ChcError::invariant(format!("assignment to unregistered variable {lhs}")))?;
    var.increase_index();
    let current = var.current_value();
    ctx.add_assertion(Expr::eq(current.clone(), value));
    Ok(current)
}

fn encode_binary(op: BinaryOperator, l: Expr, r: Expr) -> Expr {
    match op {
        BinaryOperator::Add => Expr::add(l, r),
        BinaryOperator::Sub => Expr::sub(l, r),
        BinaryOperator::Mul => Expr::mul(l, r),
        BinaryOperator::Div => Expr::div(l, r),
        BinaryOperator::Mod => Expr::modulo(l, r),
        BinaryOperator::Eq => Expr::eq(l, r),
        BinaryOperator::NotEq => Expr::not(Expr::eq(l, r)),
        BinaryOperator::Lt => Expr::lt(l, r),
        BinaryOperator::Le => Expr::le(l, r),
        BinaryOperator::Gt => Expr::gt(l, r),
        BinaryOperator::Ge => Expr::ge(l, r),
        BinaryOperator::And => Expr::and(l, r),
        BinaryOperator::Or => Expr::or(l, r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstFactory, CallKind, Type};
    use sol_fv_smtlib::sort::Sort;

    #[test]
    fn literals_encode_directly() {
        let mut f = AstFactory::new();
        let mut ctx = EncodingContext::new();
        let e = f.number(7);
        assert_eq!(encode_expression(&mut ctx, &e).unwrap(), Expr::IntLit(7));
        let e = f.boolean(true);
        assert_eq!(encode_expression(&mut ctx, &e).unwrap(), Expr::BoolLit(true));
    }

    #[test]
    fn identifier_reads_current_index() {
        let mut f = AstFactory::new();
        let decl = f.var("x", Type::Integer);
        let mut ctx = EncodingContext::new();
        ctx.create_variable(&decl);
        ctx.variable(&decl).increase_index();
        let e = f.ident(&decl);
        assert_eq!(
            encode_expression(&mut ctx, &e).unwrap(),
            Expr::var(format!("x_{}_1", decl.id), Sort::Int)
        );
    }

    #[test]
    fn unregistered_identifier_is_an_invariant_violation() {
        let mut f = AstFactory::new();
        let decl = f.var("x", Type::Integer);
        let e = f.ident(&decl);
        let mut ctx = EncodingContext::new();
        assert!(matches!(
            encode_expression(&mut ctx, &e),
            Err(ChcError::Invariant(_))
        ));
    }

    #[test]
    fn assignment_bumps_index_and_assumes_equality() {
        let mut f = AstFactory::new();
        let decl = f.var("x", Type::Integer);
        let mut ctx = EncodingContext::new();
        ctx.create_variable(&decl);
        let rhs = f.number(5);
        let e = f.assign(&decl, rhs);
        let value = encode_expression(&mut ctx, &e).unwrap();
        assert_eq!(value, Expr::var(format!("x_{}_1", decl.id), Sort::Int));
        assert_eq!(
            ctx.assertions(),
            Expr::eq(value, Expr::IntLit(5))
        );
    }

    #[test]
    fn binary_and_unary_operators() {
        let mut f = AstFactory::new();
        let mut ctx = EncodingContext::new();
        let one = f.number(1);
        let two = f.number(2);
        let e = f.binary(BinaryOperator::NotEq, one, two);
        assert_eq!(
            encode_expression(&mut ctx, &e).unwrap(),
            Expr::not(Expr::eq(Expr::IntLit(1), Expr::IntLit(2)))
        );
        let t = f.boolean(true);
        let e = f.unary(UnaryOperator::Not, t);
        assert_eq!(
            encode_expression(&mut ctx, &e).unwrap(),
            Expr::not(Expr::BoolLit(true))
        );
    }

    #[test]
    fn calls_are_rejected() {
        let mut f = AstFactory::new();
        let arg = f.boolean(true);
        let call = f.call(CallKind::Assert, None, vec![arg], Default::default());
        let mut ctx = EncodingContext::new();
        assert!(matches!(
            encode_expression(&mut ctx, &call),
            Err(ChcError::Unsupported(_, _))
        ));
    }
}

//! Evaluation of parsed host expressions against an execution context.

use crate::value::Number;
use crate::{ExecutionContext, Object, QuoteError, Value};

use super::parser::{BinOp, CmpOp, Expr, Stmt, UnaryOp};

pub(super) fn exec(stmts: &[Stmt], ctx: &mut ExecutionContext<'_>) -> Result<(), QuoteError> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign(name, value) => {
                let value = eval(value, ctx)?;
                ctx.set(name.clone(), value);
            }
            Stmt::AugAssign(name, op, value) => {
                let current = lookup(ctx, name)?;
                let value = eval(value, ctx)?;
                ctx.set(name.clone(), binary(*op, &current, &value)?);
            }
            Stmt::Expr(expr) => {
                eval(expr, ctx)?;
            }
            Stmt::Pass => {}
        }
    }
    Ok(())
}

pub(super) fn eval(expr: &Expr, ctx: &ExecutionContext<'_>) -> Result<Value, QuoteError> {
    match expr {
        Expr::Const(value) => Ok(value.clone()),
        Expr::Name(name) => lookup(ctx, name),
        Expr::List(items) => Ok(Value::list(
            items
                .iter()
                .map(|item| eval(item, ctx))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Unary(op, operand) => unary(*op, &eval(operand, ctx)?),
        Expr::Binary(op, left, right) => binary(*op, &eval(left, ctx)?, &eval(right, ctx)?),
        Expr::Compare(first, rest) => {
            let mut left = eval(first, ctx)?;
            for (op, right) in rest {
                let right = eval(right, ctx)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::bool(false));
                }
                left = right;
            }
            Ok(Value::bool(true))
        }
        Expr::Not(operand) => Ok(Value::bool(!eval(operand, ctx)?.truthy())),
        Expr::And(left, right) => {
            let left = eval(left, ctx)?;
            if !left.truthy() {
                return Ok(left);
            }
            eval(right, ctx)
        }
        Expr::Or(left, right) => {
            let left = eval(left, ctx)?;
            if left.truthy() {
                return Ok(left);
            }
            eval(right, ctx)
        }
        Expr::IfElse { cond, then, orelse } => {
            if eval(cond, ctx)?.truthy() {
                eval(then, ctx)
            } else {
                eval(orelse, ctx)
            }
        }
        Expr::Index(target, index) => subscript(&eval(target, ctx)?, &eval(index, ctx)?),
        Expr::Call(func, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(func, &args)
        }
    }
}

fn lookup(ctx: &ExecutionContext<'_>, name: &str) -> Result<Value, QuoteError> {
    ctx.get(name).ok_or_else(|| QuoteError::Name {
        name: name.to_owned(),
    })
}

fn type_error(message: String) -> QuoteError {
    QuoteError::eval(format!("TypeError: {message}"))
}

fn unsupported(op: &str, left: &Value, right: &Value) -> QuoteError {
    type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn overflow() -> QuoteError {
    QuoteError::eval("OverflowError: integer result out of range")
}

fn zero_division() -> QuoteError {
    QuoteError::eval("ZeroDivisionError: division by zero")
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, QuoteError> {
    let bad = || {
        let symbol = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
        };
        type_error(format!(
            "bad operand type for unary {symbol}: '{}'",
            operand.type_name()
        ))
    };
    match (op, operand.as_number().ok_or_else(bad)?) {
        (UnaryOp::Neg, Number::Int(i)) => i.checked_neg().map(Value::int).ok_or_else(overflow),
        (UnaryOp::Neg, Number::Float(f)) => Ok(Value::float(-f)),
        (UnaryOp::Pos, Number::Int(i)) => Ok(Value::int(i)),
        (UnaryOp::Pos, Number::Float(f)) => Ok(Value::float(f)),
        (UnaryOp::Invert, Number::Int(i)) => Ok(Value::int(!i)),
        (UnaryOp::Invert, Number::Float(_)) => Err(bad()),
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, QuoteError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return arithmetic(op, a, b).ok_or_else(|| unsupported(op.symbol(), left, right))?;
    }
    match (op, left.object(), right.object()) {
        (BinOp::Add, Object::Str(a), Object::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (BinOp::Add, Object::List(_), Object::List(_)) => {
            let mut items = left.list_items().unwrap_or_default();
            items.extend(right.list_items().unwrap_or_default());
            Ok(Value::list(items))
        }
        (BinOp::Mul, Object::Str(s), _) | (BinOp::Mul, _, Object::Str(s)) => {
            let count = repeat_count(left, right)
                .ok_or_else(|| unsupported(op.symbol(), left, right))?;
            Ok(Value::str(s.repeat(count)))
        }
        (BinOp::Mul, Object::List(_), _) | (BinOp::Mul, _, Object::List(_)) => {
            let count = repeat_count(left, right)
                .ok_or_else(|| unsupported(op.symbol(), left, right))?;
            let items = left.list_items().or_else(|| right.list_items()).unwrap_or_default();
            Ok(Value::list(items.iter().cycle().take(items.len() * count).cloned().collect()))
        }
        _ => Err(unsupported(op.symbol(), left, right)),
    }
}

/// Repetition count for `seq * n` / `n * seq`; negative counts give zero.
fn repeat_count(left: &Value, right: &Value) -> Option<usize> {
    let n = left.as_int().or_else(|| right.as_int())?;
    Some(usize::try_from(n).unwrap_or(0))
}

/// Numeric binary operation. The outer `None` means the operator does not
/// apply to these operands.
fn arithmetic(op: BinOp, a: Number, b: Number) -> Option<Result<Value, QuoteError>> {
    if let (Number::Int(a), Number::Int(b)) = (a, b) {
        return Some(int_arithmetic(op, a, b));
    }
    let (a, b) = (a.to_f64(), b.to_f64());
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
            return Some(Err(zero_division()));
        }
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => a - b * (a / b).floor(),
        BinOp::Pow => a.powf(b),
        BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd | BinOp::LShift | BinOp::RShift => {
            return None;
        }
    };
    Some(Ok(Value::float(value)))
}

fn int_arithmetic(op: BinOp, a: i64, b: i64) -> Result<Value, QuoteError> {
    let checked = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(zero_division());
            }
            return Ok(Value::float(Number::Int(a).to_f64() / Number::Int(b).to_f64()));
        }
        BinOp::FloorDiv | BinOp::Mod if b == 0 => return Err(zero_division()),
        BinOp::FloorDiv => floor_div(a, b),
        BinOp::Mod => a.checked_rem(b).map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r }),
        BinOp::Pow => {
            let Ok(exp) = u32::try_from(b) else {
                if b < 0 {
                    return Ok(Value::float(Number::Int(a).to_f64().powf(Number::Int(b).to_f64())));
                }
                return Err(overflow());
            };
            a.checked_pow(exp)
        }
        BinOp::BitOr => Some(a | b),
        BinOp::BitXor => Some(a ^ b),
        BinOp::BitAnd => Some(a & b),
        BinOp::LShift | BinOp::RShift if b < 0 => {
            return Err(QuoteError::eval("ValueError: negative shift count"));
        }
        BinOp::LShift => u32::try_from(b)
            .ok()
            .and_then(|s| a.checked_shl(s))
            .filter(|r| r >> b == a),
        BinOp::RShift => Some(u32::try_from(b).map_or(if a < 0 { -1 } else { 0 }, |s| {
            a.checked_shr(s).unwrap_or(if a < 0 { -1 } else { 0 })
        })),
    };
    checked.map(Value::int).ok_or_else(overflow)
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, QuoteError> {
    match op {
        CmpOp::Eq => Ok(left == right),
        CmpOp::Ne => Ok(left != right),
        CmpOp::Is => Ok(identical(left, right)),
        CmpOp::IsNot => Ok(!identical(left, right)),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = order(left, right).ok_or_else(|| {
                let symbol = match op {
                    CmpOp::Lt => "<",
                    CmpOp::Le => "<=",
                    CmpOp::Gt => ">",
                    _ => ">=",
                };
                type_error(format!(
                    "'{symbol}' not supported between instances of '{}' and '{}'",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

/// Identity as the host sees it: `None`, `True` and `False` are singletons.
fn identical(left: &Value, right: &Value) -> bool {
    match (left.object(), right.object()) {
        (Object::None, Object::None) => true,
        (Object::Bool(a), Object::Bool(b)) => a == b,
        _ => left.is(right),
    }
}

fn order(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return match (a, b) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            _ => a.to_f64().partial_cmp(&b.to_f64()),
        };
    }
    match (left.as_str(), right.as_str()) {
        (Some(a), Some(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, QuoteError> {
    if let Some(items) = container.list_items() {
        return Ok(items.iter().any(|candidate| candidate == item));
    }
    match (container.as_str(), item.as_str()) {
        (Some(haystack), Some(needle)) => Ok(haystack.contains(needle)),
        (Some(_), None) => Err(type_error(format!(
            "'in <string>' requires string as left operand, not {}",
            item.type_name()
        ))),
        _ => Err(type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

fn subscript(target: &Value, index: &Value) -> Result<Value, QuoteError> {
    let Some(i) = index.as_int() else {
        return Err(type_error(format!(
            "indices must be integers, not {}",
            index.type_name()
        )));
    };
    let out_of_range = || QuoteError::eval(format!("IndexError: {} index out of range", target.type_name()));
    if let Some(s) = target.as_str() {
        let len = s.chars().count();
        let at = normalize_index(i, len).ok_or_else(out_of_range)?;
        return s
            .chars()
            .nth(at)
            .map(|c| Value::str(c.to_string()))
            .ok_or_else(out_of_range);
    }
    if let Some(len) = target.list_len() {
        let at = normalize_index(i, len).ok_or_else(out_of_range)?;
        return target.list_get(at).ok_or_else(out_of_range);
    }
    Err(type_error(format!(
        "'{}' object is not subscriptable",
        target.type_name()
    )))
}

/// Resolve a possibly negative index against `len`.
fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let at = if i < 0 { i + len } else { i };
    if (0..len).contains(&at) {
        usize::try_from(at).ok()
    } else {
        None
    }
}

fn call_builtin(func: &str, args: &[Value]) -> Result<Value, QuoteError> {
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(type_error(format!(
                "{func}() takes exactly {n} argument(s) ({} given)",
                args.len()
            )))
        }
    };
    match func {
        "len" => {
            arity(1)?;
            let len = match args[0].object() {
                Object::Str(s) => s.chars().count(),
                Object::List(items) => items.lock().len(),
                _ => {
                    return Err(type_error(format!(
                        "object of type '{}' has no len()",
                        args[0].type_name()
                    )))
                }
            };
            i64::try_from(len).map(Value::int).map_err(|_| overflow())
        }
        "str" => {
            arity(1)?;
            Ok(Value::str(args[0].to_string()))
        }
        "repr" => {
            arity(1)?;
            Ok(Value::str(args[0].repr()))
        }
        "bool" => {
            arity(1)?;
            Ok(Value::bool(args[0].truthy()))
        }
        "int" => {
            arity(1)?;
            to_int(&args[0])
        }
        "float" => {
            arity(1)?;
            to_float(&args[0])
        }
        "abs" => {
            arity(1)?;
            match args[0].as_number() {
                Some(Number::Int(i)) => i.checked_abs().map(Value::int).ok_or_else(overflow),
                Some(Number::Float(f)) => Ok(Value::float(f.abs())),
                None => Err(type_error(format!(
                    "bad operand type for abs(): '{}'",
                    args[0].type_name()
                ))),
            }
        }
        "min" | "max" => extreme(func, args),
        _ => Err(QuoteError::Name {
            name: func.to_owned(),
        }),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "int() truncates toward zero like the host"
)]
fn to_int(value: &Value) -> Result<Value, QuoteError> {
    match value.object() {
        Object::Str(s) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::int)
            .map_err(|_| QuoteError::eval(format!("ValueError: invalid literal for int(): {}", value.repr()))),
        _ => match value.as_number() {
            Some(Number::Int(i)) => Ok(Value::int(i)),
            Some(Number::Float(f)) if f.is_finite() => Ok(Value::int(f.trunc() as i64)),
            Some(Number::Float(_)) => Err(overflow()),
            None => Err(type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                value.type_name()
            ))),
        },
    }
}

fn to_float(value: &Value) -> Result<Value, QuoteError> {
    match value.object() {
        Object::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::float)
            .map_err(|_| QuoteError::eval(format!("ValueError: could not convert string to float: {}", value.repr()))),
        _ => value
            .as_number()
            .map(|n| Value::float(n.to_f64()))
            .ok_or_else(|| {
                type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    value.type_name()
                ))
            }),
    }
}

fn extreme(func: &str, args: &[Value]) -> Result<Value, QuoteError> {
    let candidates = match args {
        [single] => single.list_items().ok_or_else(|| {
            type_error(format!("'{}' object is not iterable", single.type_name()))
        })?,
        _ => args.to_vec(),
    };
    let mut iter = candidates.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(QuoteError::eval(format!("ValueError: {func}() arg is an empty sequence")));
    };
    for candidate in iter {
        let ordering = order(&candidate, &best).ok_or_else(|| {
            type_error(format!(
                "'<' not supported between instances of '{}' and '{}'",
                candidate.type_name(),
                best.type_name()
            ))
        })?;
        let better = if func == "min" {
            ordering.is_lt()
        } else {
            ordering.is_gt()
        };
        if better {
            best = candidate;
        }
    }
    Ok(best)
}

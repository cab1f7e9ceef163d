use crate::{parse, AsmError, Rule};
use pest::iterators::Pair;
use provenir_core::{
    BinaryOp, CompareOp, Constant, Instruction, Label, MethodBuilder, MethodId, MethodSig,
    ProgramBuilder, Type, UnaryOp,
};
use std::collections::HashMap;

/// Assembles one source text into a program.
pub fn assemble(input: &str) -> Result<provenir_core::Program, AsmError> {
    assemble_sources(&[input])
}

/// Assembles several source texts into one program. Classes are declared across all sources
/// first, so files can reference each other's classes and reopen builtins (`Math`, `String`) to
/// attach native stubs.
pub fn assemble_sources(inputs: &[&str]) -> Result<provenir_core::Program, AsmError> {
    let mut parsed = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut pairs = parse(input)?;
        let program = pairs
            .next()
            .ok_or_else(|| AsmError::Resolve("empty parse".to_string()))?;
        let classes: Vec<Pair<'_, Rule>> = program
            .into_inner()
            .filter(|p| p.as_rule() == Rule::class_def)
            .collect();
        parsed.push(classes);
    }

    let mut builder = ProgramBuilder::new();

    // Declare every class so later passes can resolve cross references in any order.
    for classes in &parsed {
        for class in classes {
            let name = class_name(class);
            if builder.class_id(name).is_err() {
                builder.declare_class(name)?;
            }
        }
    }

    // Members: extends clauses, fields, statics, and method signatures.
    let mut bodies: Vec<(MethodId, Pair<'_, Rule>)> = Vec::new();
    for classes in &parsed {
        for class in classes {
            declare_members(&mut builder, class, &mut bodies)?;
        }
    }

    // Method bodies.
    for (id, method_pair) in bodies {
        let code = lower_body(&mut builder, method_pair)?;
        builder.define_method(id, code)?;
    }

    Ok(builder.build()?)
}

fn class_name<'i>(class: &Pair<'i, Rule>) -> &'i str {
    class
        .clone()
        .into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str())
        .unwrap_or("")
}

fn declare_members<'i>(
    builder: &mut ProgramBuilder,
    class: &Pair<'i, Rule>,
    bodies: &mut Vec<(MethodId, Pair<'i, Rule>)>,
) -> Result<(), AsmError> {
    let mut inner = class.clone().into_inner();
    let name = inner
        .next()
        .ok_or_else(|| AsmError::Resolve("class without name".to_string()))?;
    let class_id = builder.class_id(name.as_str())?;

    for item in inner {
        match item.as_rule() {
            Rule::extends_clause => {
                let parent = item.into_inner().as_str();
                let parent_id = builder.class_id(parent)?;
                builder.set_extends(class_id, parent_id)?;
            }
            Rule::field_def => {
                let (field_name, ty) = name_and_type(builder, item)?;
                builder.add_field(class_id, &field_name, ty)?;
            }
            Rule::static_def => {
                let (field_name, ty) = name_and_type(builder, item)?;
                builder.add_static(class_id, &field_name, ty)?;
            }
            Rule::native_method => {
                let (method_name, sig) = signature(builder, &item)?;
                builder.declare_native(class_id, &method_name, sig)?;
            }
            Rule::method_def => {
                let (method_name, sig) = signature(builder, &item)?;
                let id = builder.declare_method(class_id, &method_name, sig)?;
                bodies.push((id, item));
            }
            _ => {}
        }
    }
    Ok(())
}

fn name_and_type(
    builder: &ProgramBuilder,
    item: Pair<'_, Rule>,
) -> Result<(String, Type), AsmError> {
    let mut inner = item.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| AsmError::Resolve("field without name".to_string()))?
        .as_str()
        .to_string();
    let ty = inner
        .next()
        .ok_or_else(|| AsmError::Resolve(format!("field {} without type", name)))
        .and_then(|p| resolve_type(builder, p))?;
    Ok((name, ty))
}

fn signature(
    builder: &ProgramBuilder,
    method: &Pair<'_, Rule>,
) -> Result<(String, MethodSig), AsmError> {
    let mut name = String::new();
    let mut params = Vec::new();
    let mut ret = None;
    for part in method.clone().into_inner() {
        match part.as_rule() {
            Rule::ident => name = part.as_str().to_string(),
            Rule::param_list => {
                for param in part.into_inner() {
                    let ty_pair = param
                        .into_inner()
                        .nth(1)
                        .ok_or_else(|| AsmError::Resolve("parameter without type".to_string()))?;
                    params.push(resolve_type(builder, ty_pair)?);
                }
            }
            Rule::ret_clause => {
                let ty_pair = part
                    .into_inner()
                    .next()
                    .ok_or_else(|| AsmError::Resolve("return clause without type".to_string()))?;
                ret = Some(resolve_type(builder, ty_pair)?);
            }
            _ => {}
        }
    }
    Ok((name, MethodSig::new(params, ret)))
}

fn resolve_type(builder: &ProgramBuilder, pair: Pair<'_, Rule>) -> Result<Type, AsmError> {
    let mut base = None;
    let mut dims = 0u8;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => base = Some(part.as_str().to_string()),
            Rule::array_suffix => dims += 1,
            _ => {}
        }
    }
    let base = base.ok_or_else(|| AsmError::Resolve("type without base".to_string()))?;
    let ty = match base.as_str() {
        "int" => Type::Int,
        "float" => Type::Float,
        "bool" => Type::Bool,
        name => Type::Object(builder.class_id(name)?),
    };
    Ok(ty.nested_array(dims))
}

fn lower_body(
    builder: &mut ProgramBuilder,
    method: Pair<'_, Rule>,
) -> Result<provenir_core::Code, AsmError> {
    let mut max_locals = 0u16;
    let mut param_count = 0u16;
    let mut items = Vec::new();
    let mut handlers = Vec::new();

    for part in method.into_inner() {
        match part.as_rule() {
            Rule::param_list => param_count = part.into_inner().count() as u16,
            Rule::locals_decl => {
                max_locals = parse_num::<u16>(part.into_inner().as_str())?;
            }
            Rule::label_def | Rule::instruction => items.push(part),
            Rule::handler_decl => handlers.push(part),
            _ => {}
        }
    }

    let mut mb = MethodBuilder::new(max_locals.max(param_count));
    let mut labels: HashMap<String, Label> = HashMap::new();
    let mut bound: Vec<String> = Vec::new();

    for item in items {
        match item.as_rule() {
            Rule::label_def => {
                let name = item.into_inner().as_str().to_string();
                if bound.contains(&name) {
                    return Err(AsmError::Resolve(format!("label {} bound twice", name)));
                }
                let label = label_for(&mut mb, &mut labels, &name);
                mb.bind(label);
                bound.push(name);
            }
            Rule::instruction => {
                let inst = item
                    .into_inner()
                    .next()
                    .ok_or_else(|| AsmError::Resolve("empty instruction".to_string()))?;
                lower_instruction(builder, &mut mb, &mut labels, inst)?;
            }
            _ => {}
        }
    }

    for handler in handlers {
        let mut names: Vec<&str> = Vec::new();
        let mut class = None;
        for part in handler.into_inner() {
            match part.as_rule() {
                Rule::ident => names.push(part.as_str()),
                Rule::catch_clause => {
                    class = Some(builder.class_id(part.into_inner().as_str())?);
                }
                _ => {}
            }
        }
        if names.len() != 3 {
            return Err(AsmError::Resolve("handler needs three labels".to_string()));
        }
        let start = label_for(&mut mb, &mut labels, names[0]);
        let end = label_for(&mut mb, &mut labels, names[1]);
        let target = label_for(&mut mb, &mut labels, names[2]);
        mb.add_handler(start, end, target, class);
    }

    Ok(mb.finish()?)
}

fn label_for(mb: &mut MethodBuilder, labels: &mut HashMap<String, Label>, name: &str) -> Label {
    match labels.get(name) {
        Some(label) => *label,
        None => {
            let label = mb.new_label();
            labels.insert(name.to_string(), label);
            label
        }
    }
}

fn lower_instruction(
    builder: &ProgramBuilder,
    mb: &mut MethodBuilder,
    labels: &mut HashMap<String, Label>,
    inst: Pair<'_, Rule>,
) -> Result<(), AsmError> {
    match inst.as_rule() {
        Rule::i_const => {
            let literal = inst
                .into_inner()
                .next()
                .and_then(|l| l.into_inner().next())
                .ok_or_else(|| AsmError::Resolve("const without literal".to_string()))?;
            let value = match literal.as_rule() {
                Rule::float_lit => Constant::Float(parse_num::<f64>(literal.as_str())?),
                Rule::int_lit => Constant::Int(parse_num::<i64>(literal.as_str())?),
                Rule::bool_lit => Constant::Bool(literal.as_str() == "true"),
                Rule::null_lit => Constant::Null,
                Rule::string_lit => {
                    let text = literal.as_str();
                    Constant::Str(text[1..text.len() - 1].to_string())
                }
                _ => return Err(AsmError::Resolve("unknown literal".to_string())),
            };
            mb.emit(Instruction::Const { value });
        }
        Rule::i_unary => {
            let op = match inst.as_str() {
                "neg" => UnaryOp::Neg,
                _ => UnaryOp::Not,
            };
            mb.unary(op);
        }
        Rule::i_binary => {
            mb.binary(binary_op(inst.as_str())?);
        }
        Rule::i_cmp => {
            let op = cmp_op(inst.into_inner().as_str())?;
            mb.compare(op);
        }
        Rule::i_stack => {
            match inst.as_str() {
                "dup" => mb.dup(),
                "pop" => mb.pop(),
                _ => mb.swap(),
            };
        }
        Rule::i_load => {
            mb.load(parse_num::<u16>(inst.into_inner().as_str())?);
        }
        Rule::i_store => {
            mb.store(parse_num::<u16>(inst.into_inner().as_str())?);
        }
        Rule::i_getfield => {
            let (class, field) = split_qualified(inst.into_inner().as_str())?;
            mb.get_field(builder.field_ref(builder.class_id(class)?, field)?);
        }
        Rule::i_putfield => {
            let (class, field) = split_qualified(inst.into_inner().as_str())?;
            mb.put_field(builder.field_ref(builder.class_id(class)?, field)?);
        }
        Rule::i_getstatic => {
            let (class, field) = split_qualified(inst.into_inner().as_str())?;
            mb.get_static(builder.static_ref(builder.class_id(class)?, field)?);
        }
        Rule::i_putstatic => {
            let (class, field) = split_qualified(inst.into_inner().as_str())?;
            mb.put_static(builder.static_ref(builder.class_id(class)?, field)?);
        }
        Rule::i_new => {
            mb.new_object(builder.class_id(inst.into_inner().as_str())?);
        }
        Rule::i_newarray => {
            let ty_pair = inst
                .into_inner()
                .next()
                .ok_or_else(|| AsmError::Resolve("newarray without type".to_string()))?;
            mb.new_array(resolve_type(builder, ty_pair)?);
        }
        Rule::i_multianewarray => {
            let mut inner = inst.into_inner();
            let ty_pair = inner
                .next()
                .ok_or_else(|| AsmError::Resolve("multianewarray without type".to_string()))?;
            let elem = resolve_type(builder, ty_pair)?;
            let dims = parse_num::<u8>(inner.as_str())?;
            mb.multi_new_array(elem, dims);
        }
        Rule::i_aload => {
            mb.array_load();
        }
        Rule::i_astore => {
            mb.array_store();
        }
        Rule::i_alength => {
            mb.array_length();
        }
        Rule::i_checkcast => {
            let ty_pair = inst
                .into_inner()
                .next()
                .ok_or_else(|| AsmError::Resolve("checkcast without type".to_string()))?;
            mb.check_cast(resolve_type(builder, ty_pair)?);
        }
        Rule::i_instanceof => {
            let ty_pair = inst
                .into_inner()
                .next()
                .ok_or_else(|| AsmError::Resolve("instanceof without type".to_string()))?;
            mb.instance_of(resolve_type(builder, ty_pair)?);
        }
        Rule::i_ifz => {
            let mut inner = inst.into_inner();
            let op = cmp_op(next_str(&mut inner)?)?;
            let label = label_for(mb, labels, next_str(&mut inner)?);
            mb.if_zero(op, label);
        }
        Rule::i_ifcmp => {
            let mut inner = inst.into_inner();
            let op = cmp_op(next_str(&mut inner)?)?;
            let label = label_for(mb, labels, next_str(&mut inner)?);
            mb.if_compare(op, label);
        }
        Rule::i_goto => {
            let label = label_for(mb, labels, inst.into_inner().as_str());
            mb.goto(label);
        }
        Rule::i_switch => {
            let mut cases = Vec::new();
            let mut default = None;
            for part in inst.into_inner() {
                match part.as_rule() {
                    Rule::switch_case => {
                        let mut inner = part.into_inner();
                        let value = parse_num::<i64>(next_str(&mut inner)?)?;
                        let label = label_for(mb, labels, next_str(&mut inner)?);
                        cases.push((value, label));
                    }
                    Rule::ident => {
                        default = Some(label_for(mb, labels, part.as_str()));
                    }
                    _ => {}
                }
            }
            let default =
                default.ok_or_else(|| AsmError::Resolve("switch without default".to_string()))?;
            mb.switch(cases, default);
        }
        Rule::i_invoke => {
            let (class, method) = split_qualified(inst.into_inner().as_str())?;
            mb.invoke(builder.method_id(builder.class_id(class)?, method)?);
        }
        Rule::i_retv => {
            mb.ret_value();
        }
        Rule::i_ret => {
            mb.ret();
        }
        Rule::i_throw => {
            mb.throw();
        }
        Rule::i_halt => {
            mb.halt();
        }
        other => {
            return Err(AsmError::Resolve(format!(
                "unhandled instruction rule {:?}",
                other
            )))
        }
    }
    Ok(())
}

fn binary_op(text: &str) -> Result<BinaryOp, AsmError> {
    Ok(match text {
        "add" => BinaryOp::Add,
        "sub" => BinaryOp::Sub,
        "mul" => BinaryOp::Mul,
        "div" => BinaryOp::Div,
        "rem" => BinaryOp::Rem,
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        "xor" => BinaryOp::Xor,
        "shl" => BinaryOp::Shl,
        "shr" => BinaryOp::Shr,
        other => return Err(AsmError::Resolve(format!("unknown operator {}", other))),
    })
}

fn cmp_op(text: &str) -> Result<CompareOp, AsmError> {
    Ok(match text {
        "eq" => CompareOp::Eq,
        "ne" => CompareOp::Ne,
        "lt" => CompareOp::Lt,
        "le" => CompareOp::Le,
        "gt" => CompareOp::Gt,
        "ge" => CompareOp::Ge,
        other => return Err(AsmError::Resolve(format!("unknown comparison {}", other))),
    })
}

fn split_qualified(text: &str) -> Result<(&str, &str), AsmError> {
    text.split_once('.')
        .ok_or_else(|| AsmError::Resolve(format!("expected Class.member, got {}", text)))
}

fn next_str<'i>(
    inner: &mut pest::iterators::Pairs<'i, Rule>,
) -> Result<&'i str, AsmError> {
    inner
        .next()
        .map(|p| p.as_str())
        .ok_or_else(|| AsmError::Resolve("missing token".to_string()))
}

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T, AsmError>
where
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse::<T>()
        .map_err(|e| AsmError::Resolve(format!("bad number {}: {}", text, e)))
}

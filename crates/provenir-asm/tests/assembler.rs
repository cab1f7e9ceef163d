use pretty_assertions::assert_eq;
use provenir_asm::{assemble, assemble_sources};
use provenir_core::{CompareOp, Instruction, Pc, Type};

#[test]
fn assembles_branches_to_resolved_targets() {
    let program = assemble(
        r#"
class Main {
    method main(x: int) -> int {
        locals 2
        entry:
            load 0
            const 0
            ifcmp gt positive
            load 0
            neg
            store 1
            goto done
        positive:
            load 0
            store 1
        done:
            load 1
            retv
    }
}
"#,
    )
    .unwrap();

    let main = program.method_by_name("Main.main").expect("Main.main");
    let code = main.code().expect("bytecode body");
    assert_eq!(code.max_locals, 2);
    assert_eq!(
        code.code[2],
        Instruction::IfCompare {
            cond: CompareOp::Gt,
            target: Pc(7),
        }
    );
    assert_eq!(code.code[6], Instruction::Goto { target: Pc(9) });
    assert_eq!(code.code.len(), 11);
}

#[test]
fn assembles_handlers_with_class_filters() {
    let program = assemble(
        r#"
class Main {
    method main(a: int, b: int) {
        locals 3
        tryStart:
            load 0
            load 1
            div
            store 2
        tryEnd:
            halt
        onError:
            store 2
            halt
        handler tryStart tryEnd onError catch ArithmeticError
    }
}
"#,
    )
    .unwrap();

    let main = program.method_by_name("Main.main").expect("Main.main");
    let code = main.code().expect("bytecode body");
    assert_eq!(code.handlers.len(), 1);
    let handler = &code.handlers[0];
    assert_eq!(handler.start, Pc(0));
    assert_eq!(handler.end, Pc(4));
    assert_eq!(handler.target, Pc(5));
    let arith = program.class_by_name("ArithmeticError").expect("builtin");
    assert_eq!(handler.class, Some(arith.id));
}

#[test]
fn resolves_fields_statics_and_types() {
    let program = assemble(
        r#"
class Point {
    field x: int
    field y: int
    static count: int
}

class Main {
    method main() {
        locals 2
        new Point
        store 0
        load 0
        const 3
        putfield Point.y
        const 4
        newarray int[]
        store 1
        halt
    }
}
"#,
    )
    .unwrap();

    let point = program.class_by_name("Point").expect("Point");
    assert_eq!(point.fields.len(), 2);
    assert_eq!(point.statics.len(), 1);

    let main = program.method_by_name("Main.main").expect("Main.main");
    let code = main.code().expect("bytecode body");
    let Instruction::PutField { field } = &code.code[4] else {
        panic!("expected putfield, got {:?}", code.code[4]);
    };
    assert_eq!(field.class, point.id);
    assert_eq!(field.index, 1);
    assert_eq!(
        code.code[6],
        Instruction::NewArray {
            elem: Type::array_of(Type::Int),
        }
    );
}

#[test]
fn classes_resolve_across_sources() {
    let lib = r#"
class Helper {
    method id(v: int) -> int {
        locals 1
        load 0
        retv
    }
}
"#;
    let app = r#"
class Main {
    method main() {
        locals 1
        const 5
        invoke Helper.id
        store 0
        halt
    }
}
"#;
    let program = assemble_sources(&[app, lib]).unwrap();
    assert!(program.method_by_name("Helper.id").is_some());
    assert!(program.method_by_name("Main.main").is_some());
}

#[test]
fn reopening_a_builtin_attaches_natives() {
    let program = assemble(
        r#"
class String {
    native method length(s: String) -> int
}

class Main {
    method main() {
        locals 1
        const "abc"
        invoke String.length
        store 0
        halt
    }
}
"#,
    )
    .unwrap();

    let length = program.method_by_name("String.length").expect("String.length");
    assert!(length.is_native());
    // The reopened class is still the builtin, backing array field intact.
    let string = program.class_by_name("String").expect("String");
    assert_eq!(string.fields.len(), 1);
}

#[test]
fn unbound_labels_are_rejected() {
    let result = assemble(
        r#"
class Main {
    method main() {
        goto nowhere
    }
}
"#,
    );
    assert!(result.is_err());
}

#[test]
fn unknown_classes_are_rejected() {
    let result = assemble(
        r#"
class Main {
    method main() {
        new Ghost
        halt
    }
}
"#,
    );
    assert!(result.is_err());
}

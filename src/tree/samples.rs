//! Small hand-built functions covering the interesting construction and
//! allocation shapes. Used by the `trace_alloc` binary and by tests.

use super::{BinaryOp, Expr, Function, Stmt, Type, UnaryOp};

/// `int straight() { int a = 1; int b = 2; return a + b; }`
pub fn straight_line() -> Function {
    Function::new(
        "straight",
        &[],
        vec![
            Stmt::declare("a", Expr::int(1)),
            Stmt::declare("b", Expr::int(2)),
            Stmt::Return(Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b"))),
        ],
    )
}

/// `int diamond() { int x = 0; if (true) { x = 1; } return x; }`
pub fn if_without_else() -> Function {
    Function::new(
        "diamond",
        &[],
        vec![
            Stmt::declare("x", Expr::int(0)),
            Stmt::If {
                cond: Expr::bool(true),
                then: vec![Stmt::assign("x", Expr::int(1))],
                otherwise: None,
            },
            Stmt::Return(Expr::var("x")),
        ],
    )
}

/// `int count(int n) { int i = 0; while (i < n) { i = i + 1; } return i; }`
pub fn counting_loop() -> Function {
    Function::new(
        "count",
        &["n"],
        vec![
            Stmt::declare("i", Expr::int(0)),
            Stmt::While {
                cond: Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::var("n")),
                body: vec![Stmt::assign(
                    "i",
                    Expr::binary(BinaryOp::Add, Expr::var("i"), Expr::int(1)),
                )],
            },
            Stmt::Return(Expr::var("i")),
        ],
    )
}

/// `int divs(int x, int y) { x / y; x / y; return 0; }`
pub fn sequential_divisions() -> Function {
    Function::new(
        "divs",
        &["x", "y"],
        vec![
            Stmt::Expr(Expr::binary(BinaryOp::Div, Expr::var("x"), Expr::var("y"))),
            Stmt::Expr(Expr::binary(BinaryOp::Div, Expr::var("x"), Expr::var("y"))),
            Stmt::Return(Expr::int(0)),
        ],
    )
}

/// Six parameters that are all live at once, summed pairwise at the end.
pub fn high_pressure() -> Function {
    let names = ["p0", "p1", "p2", "p3", "p4", "p5"];
    let mut sum = Expr::var(names[0]);
    for name in &names[1..] {
        sum = Expr::binary(BinaryOp::Add, sum, Expr::var(name));
    }
    Function::new(
        "pressure",
        &names,
        vec![
            Stmt::declare("t", Expr::binary(BinaryOp::Mul, Expr::var("p0"), Expr::var("p5"))),
            Stmt::Return(Expr::binary(BinaryOp::Add, sum, Expr::var("t"))),
        ],
    )
}

/// Loop whose back edge swaps two variables, forcing a move cycle.
///
/// ```text
/// int swap(int n) {
///     int a = 1; int b = 2;
///     while (a < n) { int t = a; a = b; b = t + a; }
///     return a - b;
/// }
/// ```
pub fn swapping_loop() -> Function {
    Function::new(
        "swap",
        &["n"],
        vec![
            Stmt::declare("a", Expr::int(1)),
            Stmt::declare("b", Expr::int(2)),
            Stmt::While {
                cond: Expr::binary(BinaryOp::Lt, Expr::var("a"), Expr::var("n")),
                body: vec![
                    Stmt::declare("t", Expr::var("a")),
                    Stmt::assign("a", Expr::var("b")),
                    Stmt::assign(
                        "b",
                        Expr::binary(BinaryOp::Add, Expr::var("t"), Expr::var("a")),
                    ),
                ],
            },
            Stmt::Return(Expr::binary(BinaryOp::Sub, Expr::var("a"), Expr::var("b"))),
        ],
    )
}

/// `for` loop with `continue`, `break`, a ternary and a modulo in the body.
///
/// ```text
/// int sum_odd(int n) {
///     int s = 0;
///     for (int i = 0; i < n; i += 1) {
///         if (i % 2 == 0) { continue; }
///         if (s > 100) { break; }
///         s += i > 10 ? i : -i;
///     }
///     return s;
/// }
/// ```
pub fn for_loop() -> Function {
    let is_even = Expr::binary(
        BinaryOp::Eq,
        Expr::binary(BinaryOp::Mod, Expr::var("i"), Expr::int(2)),
        Expr::int(0),
    );
    Function::new(
        "sum_odd",
        &["n"],
        vec![
            Stmt::declare("s", Expr::int(0)),
            Stmt::For {
                init: Some(Box::new(Stmt::declare("i", Expr::int(0)))),
                cond: Some(Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::var("n"))),
                step: Some(Box::new(Stmt::compound("i", BinaryOp::Add, Expr::int(1)))),
                body: vec![
                    Stmt::If {
                        cond: is_even,
                        then: vec![Stmt::Continue],
                        otherwise: None,
                    },
                    Stmt::If {
                        cond: Expr::binary(BinaryOp::Gt, Expr::var("s"), Expr::int(100)),
                        then: vec![Stmt::Break],
                        otherwise: None,
                    },
                    Stmt::compound(
                        "s",
                        BinaryOp::Add,
                        Expr::ternary(
                            Expr::binary(BinaryOp::Gt, Expr::var("i"), Expr::int(10)),
                            Expr::var("i"),
                            Expr::unary(UnaryOp::Neg, Expr::var("i")),
                        ),
                    ),
                ],
            },
            Stmt::Return(Expr::var("s")),
        ],
    )
}

/// A `for` with `continue` and `break` nested in a `while`. `keep` is defined
/// before both loops and read only after them.
///
/// ```text
/// int nested(int n, int m) {
///     int keep = n * 3;
///     int total = 0;
///     int i = 0;
///     while (i < n) {
///         for (int j = 0; j < m; j += 1) {
///             if (j == i) { continue; }
///             if (total > 1000) { break; }
///             total += j;
///         }
///         i += 1;
///     }
///     return total + keep;
/// }
/// ```
pub fn nested_loops() -> Function {
    let inner = Stmt::For {
        init: Some(Box::new(Stmt::declare("j", Expr::int(0)))),
        cond: Some(Expr::binary(BinaryOp::Lt, Expr::var("j"), Expr::var("m"))),
        step: Some(Box::new(Stmt::compound("j", BinaryOp::Add, Expr::int(1)))),
        body: vec![
            Stmt::If {
                cond: Expr::binary(BinaryOp::Eq, Expr::var("j"), Expr::var("i")),
                then: vec![Stmt::Continue],
                otherwise: None,
            },
            Stmt::If {
                cond: Expr::binary(BinaryOp::Gt, Expr::var("total"), Expr::int(1000)),
                then: vec![Stmt::Break],
                otherwise: None,
            },
            Stmt::compound("total", BinaryOp::Add, Expr::var("j")),
        ],
    };
    Function::new(
        "nested",
        &["n", "m"],
        vec![
            Stmt::declare("keep", Expr::binary(BinaryOp::Mul, Expr::var("n"), Expr::int(3))),
            Stmt::declare("total", Expr::int(0)),
            Stmt::declare("i", Expr::int(0)),
            Stmt::While {
                cond: Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::var("n")),
                body: vec![inner, Stmt::compound("i", BinaryOp::Add, Expr::int(1))],
            },
            Stmt::Return(Expr::binary(BinaryOp::Add, Expr::var("total"), Expr::var("keep"))),
        ],
    )
}

/// Both branches return; nothing after the `if` is reachable.
pub fn early_return() -> Function {
    Function::new(
        "sign",
        &["v"],
        vec![
            Stmt::Declare {
                name: "neg".to_string(),
                ty: Type::Bool,
                init: Some(Expr::binary(BinaryOp::Lt, Expr::var("v"), Expr::int(0))),
            },
            Stmt::If {
                cond: Expr::typed_var("neg", Type::Bool),
                then: vec![Stmt::Return(Expr::int(-1))],
                otherwise: Some(vec![Stmt::Return(Expr::int(1))]),
            },
            Stmt::Return(Expr::int(0)),
        ],
    )
}

/// All samples, in a stable order.
pub fn all() -> Vec<Function> {
    vec![
        straight_line(),
        if_without_else(),
        counting_loop(),
        sequential_divisions(),
        high_pressure(),
        swapping_loop(),
        for_loop(),
        nested_loops(),
        early_return(),
    ]
}

/// Look a sample up by its function name.
pub fn by_name(name: &str) -> Option<Function> {
    all().into_iter().find(|f| f.name == name)
}

//! The C runtime ABI the emitted IR links against. The emitter declares every
//! symbol once at module top and calls them directly; the runtime library
//! itself is an external artifact supplied to the native toolchain.

pub struct RuntimeFn {
    pub name: &'static str,
    pub ret: &'static str,
    pub params: &'static [&'static str],
    pub variadic: bool,
}

pub const RUNTIME: &[RuntimeFn] = &[
    RuntimeFn {
        name: "culebra_print_int",
        ret: "void",
        params: &["i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_print_float",
        ret: "void",
        params: &["double"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_print_string",
        ret: "void",
        params: &["i8*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_print_bool",
        ret: "void",
        params: &["i1"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_print_multi",
        ret: "void",
        params: &["i32"],
        variadic: true,
    },
    RuntimeFn {
        name: "culebra_input",
        ret: "i8*",
        params: &["i8*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_len",
        ret: "i64",
        params: &["i8*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_len_array",
        ret: "i64",
        params: &["%array*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_chr",
        ret: "i8*",
        params: &["i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_ord",
        ret: "i64",
        params: &["i8*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_str_concat",
        ret: "i8*",
        params: &["i8*", "i8*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_int_to_str",
        ret: "i8*",
        params: &["i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_float_to_str",
        ret: "i8*",
        params: &["double"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_bool_to_str",
        ret: "i8*",
        params: &["i1"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_create_array",
        ret: "%array*",
        params: &["i64", "i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_get",
        ret: "i8*",
        params: &["%array*", "i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_set",
        ret: "void",
        params: &["%array*", "i64", "i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_push",
        ret: "void",
        params: &["%array*", "i64"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_pop",
        ret: "i64",
        params: &["%array*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_sort_int",
        ret: "void",
        params: &["%array*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_sort_float",
        ret: "void",
        params: &["%array*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_array_sort_str",
        ret: "void",
        params: &["%array*"],
        variadic: false,
    },
    RuntimeFn {
        name: "culebra_str_split",
        ret: "%array*",
        params: &["i8*", "i8*"],
        variadic: false,
    },
];

/// Render the `declare` block for the module preamble.
pub fn declarations() -> String {
    let mut out = String::new();

    for f in RUNTIME {
        let mut params = f.params.join(", ");
        if f.variadic {
            params.push_str(", ...");
        }
        out.push_str(&format!("declare {} @{}({})\n", f.ret, f.name, params));
    }

    out
}

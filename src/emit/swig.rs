//! SWIG interface emission.
//!
//! Reads a fully bound [`BindingContext`] and writes the `<module>.i`
//! transcript. Generics become `%define` templates instantiated once per
//! specialization; classes mirror their struct and `%extend` it with the
//! bound functions; directors get a virtual hook table, C trampolines and a
//! builder that installs them.

use crate::binding::class::{Class, FieldSlot};
use crate::binding::context::BindingContext;
use crate::binding::director::Director;
use crate::binding::enums::Enum;
use crate::binding::errors::BindError;
use crate::binding::func::{BindingKind, Func};
use crate::binding::generic::Generic;
use crate::emit::declarator::Declarator;
use crate::emit::writer::Writer;

/// Render the interface for `ctx`.
///
/// Fails only if the generic dependency graph has a cycle.
pub fn render(ctx: &BindingContext) -> Result<String, BindError> {
    let mut emitter = Emitter {
        ctx,
        declarator: Declarator::new(ctx),
        w: Writer::new(),
    };
    emitter.emit()?;
    Ok(emitter.w.finish())
}

struct Emitter<'a> {
    ctx: &'a BindingContext,
    declarator: Declarator<'a>,
    w: Writer,
}

impl Emitter<'_> {
    fn emit(&mut self) -> Result<(), BindError> {
        let ctx = self.ctx;
        let options = ctx.options();

        if options.directors {
            self.w.line(&format!("%module(directors=1) {}", options.module));
        } else {
            self.w.line(&format!("%module {}", options.module));
        }
        self.w.line("%{");
        for header in ctx.includes() {
            self.w.line(&format!("#include <{}>", header));
        }
        self.w.line("%}");

        self.prologue();

        let order = ctx.generics().dependency_order()?;
        for generic in &order {
            self.generic(generic);
        }
        for generic in &order {
            self.extensions(generic);
        }

        for class in ctx.classes() {
            self.class(class);
        }
        for director in ctx.directors() {
            self.director(director);
        }
        for enumeration in ctx.enums() {
            self.enumeration(enumeration);
        }
        for macro_enum in ctx.macro_enums() {
            for (name, definition) in &macro_enum.defines {
                self.w.line(&format!("#define {} {}", name, definition));
            }
        }
        Ok(())
    }

    /// Deprecation toggles and the helper deprecated calls go through.
    fn prologue(&mut self) {
        let m = &self.ctx.options().module;
        self.w.line("%inline %{");
        self.w.lines([
            format!("bool {}_warn_deprecate = true;", m),
            format!("bool {}_warn_deprecate_instructions = true;", m),
        ]);
        self.w.line("%}");

        self.w.line("%{");
        self.w
            .line(&format!("static void {}_try_warn_deprecate(const char *name, const char *c_name) {{", m));
        self.w.indented(|w| {
            w.line(&format!("if (!{}_warn_deprecate) {{", m));
            w.indented(|w| w.line("return;"));
            w.line("}");
            w.line("PyErr_WarnFormat(PyExc_DeprecationWarning, 1, \"%s (%s) is deprecated\", name, c_name);");
            w.line(&format!("if ({}_warn_deprecate_instructions) {{", m));
            w.indented(|w| {
                w.line(&format!(
                    "PySys_WriteStderr(\"Set {}.cvar.{}_warn_deprecate = False to hide deprecation warnings\\n\");",
                    m, m
                ));
                w.line(&format!("{}_warn_deprecate_instructions = false;", m));
            });
            w.line("}");
        });
        self.w.line("}");
        self.w.line("%}");
    }

    fn generic(&mut self, generic: &Generic) {
        let name = &generic.name;
        self.w.line(&format!("%define %{}(TYPE)", name));
        self.w.indent();
        self.w.line(&format!("%nodefaultctor {}_##TYPE;", name));
        // Instantiations are the same type in C, distinct only to SWIG
        self.w.lines([
            "%{".to_string(),
            format!("typedef {} {}_##TYPE;", name, name),
            "%}".to_string(),
        ]);
        self.w.line(&format!("typedef struct {{}} {}_##TYPE;", name));

        self.w.line(&format!("%extend {}_##TYPE {{", name));
        self.w.indent();
        for (method_name, method) in &generic.methods {
            self.func(method, method_name, &generic.struct_name);
        }
        for (signature, body) in &generic.python_methods {
            self.w.line("%pythoncode %{");
            self.w.indented(|w| {
                w.line(&format!("def {}:", signature));
                w.indented(|w| w.lines(body));
            });
            self.w.line("%}");
        }
        self.w.dedent();
        self.w.line("}");
        self.w.dedent();
        self.w.line("%enddef");

        for specialization in &generic.specializations {
            self.w.line(&format!("%{}({})", name, specialization));
        }
    }

    fn extensions(&mut self, generic: &Generic) {
        for (specialization, lines) in &generic.extensions {
            self.w
                .line(&format!("%extend {}_{} {{", generic.name, specialization));
            self.w.indented(|w| w.lines(lines));
            self.w.line("}");
        }
    }

    fn class(&mut self, class: &Class) {
        let s = &class.struct_name;
        self.w.lines([
            format!("typedef struct {} {};", s, class.name),
            format!("%rename {} {};", s, class.name),
        ]);

        for field in class.all_fields() {
            if let Some(rename) = &field.rename {
                self.w.line(&format!("%rename {}::{} {};", s, field.name, rename));
            }
        }

        self.w.line(&format!("struct {} {{", s));
        self.w.indent();
        for slot in &class.fields {
            match slot {
                FieldSlot::Field(field) => {
                    let decl = self.declarator.stringify(&field.name, &field.ctype, false);
                    self.w.line(&format!("{};", decl));
                }
                FieldSlot::Union(members) => {
                    self.w.line("union {");
                    self.w.indent();
                    for member in members {
                        let decl = self.declarator.stringify(&member.name, &member.ctype, false);
                        self.w.line(&format!("{};", decl));
                    }
                    self.w.dedent();
                    self.w.line("};");
                }
            }
        }
        self.w.dedent();
        self.w.line("};");

        for field in class.all_fields() {
            if field.rename.is_some() {
                self.w.line(&format!("%rename {}::{} \"\";", s, field.name));
            }
        }

        if !class.has_functions() {
            return;
        }
        self.w.line(&format!("%extend {} {{", s));
        self.w.indent();
        if let Some(constructor) = &class.constructor {
            self.func(constructor, s, s);
        }
        if let Some(destructor) = &class.destructor {
            self.func(destructor, s, s);
        }
        for (name, func) in &class.funcs {
            self.func(func, name, s);
        }
        for (name, method) in &class.methods {
            self.func(method, name, s);
        }
        self.w.dedent();
        self.w.line("}");
    }

    /// One `%extend` member. `name` is the bound name; constructors and
    /// destructors are named after `struct_name`.
    fn func(&mut self, func: &Func, name: &str, struct_name: &str) {
        let options = self.ctx.options();
        let cfunc = &func.cfunc;

        for typemap in &func.typemaps {
            self.w
                .line(&format!("%{}_activate({})", typemap.name, typemap.directive_args()));
        }

        let generic_ret = func.is_generic_return();
        let decl = self.declarator.stringify(name, &cfunc.result, generic_ret);

        let mut outer = Vec::new();
        let mut inner = Vec::new();
        let mut nonnull = Vec::new();
        if func.kind.elides_receiver() {
            inner.push("$self".to_string());
        }
        for arg in func.bound_args() {
            let arg_name = if arg.name == "self" {
                "_self".to_string()
            } else {
                arg.name.clone()
            };

            let mut arg_decl = self
                .declarator
                .stringify(&arg_name, &arg.ctype, func.is_generic_arg(arg));
            if let Some(default) = &arg.default {
                arg_decl = format!("{} = {}", arg_decl, default);
            }
            if arg.annotations.contains(&options.nonnull_marker) {
                nonnull.push(arg_name.clone());
            }
            outer.push(arg_decl);
            inner.push(arg_name);
        }
        let outer = outer.join(", ");
        let inner = inner.join(", ");

        if !nonnull.is_empty() {
            self.w.lines([format!("%contract {}({}) {{", name, outer), "require:".to_string()]);
            self.w
                .indented(|w| w.lines(nonnull.iter().map(|arg| format!("{} != NULL;", arg))));
            self.w.line("}");
        }

        let head = match func.kind {
            BindingKind::Method | BindingKind::Generic(_) => format!("{}({}) {{", decl, outer),
            BindingKind::Static => format!("static {}({}) {{", decl, outer),
            BindingKind::Constructor => format!("{}({}) {{", struct_name, outer),
            BindingKind::Destructor => format!("~{}({}) {{", struct_name, outer),
        };
        self.w.line(&head);
        self.w.indent();
        if cfunc.has_annotation(&options.deprecated_marker) {
            self.w.line(&format!(
                "{}_try_warn_deprecate(\"{}\", \"{}\");",
                options.module, name, cfunc.name
            ));
        }
        if let BindingKind::Generic(_) = func.kind {
            let cast = self.declarator.stringify("", &cfunc.result, generic_ret);
            self.w
                .line(&format!("return ({}){}({});", cast, cfunc.name, inner));
        } else {
            self.w.line(&format!("return {}({});", cfunc.name, inner));
        }
        self.w.dedent();
        self.w.line("}");

        for typemap in &func.typemaps {
            self.w
                .line(&format!("%{}_deactivate({})", typemap.name, typemap.directive_args()));
        }
    }

    fn director(&mut self, director: &Director) {
        let n = &director.name;
        let d = &self.declarator;

        let signatures: Vec<(String, String)> = director
            .hooks
            .iter()
            .map(|hook| {
                let args = hook
                    .args
                    .iter()
                    .map(|arg| d.stringify(&arg.name, &arg.ctype, false))
                    .collect::<Vec<_>>()
                    .join(", ");
                (d.stringify(&hook.name, &hook.result, false), args)
            })
            .collect();

        self.w.line(&format!("%feature(\"director\") {}Director;", n));

        self.w.lines(["%inline %{".to_string(), format!("struct {}Director {{", n)]);
        self.w.indented(|w| {
            for (hook, (decl, args)) in director.hooks.iter().zip(&signatures) {
                w.lines([
                    format!("virtual {}({}) {{", decl, args),
                    format!("    throw Swig::DirectorPureVirtualException(\"{}\");", hook.name),
                    "}".to_string(),
                ]);
            }
            w.line(&format!("virtual ~{}Director() {{}}", n));
        });
        self.w.lines(["};", "%}"]);

        self.w.lines([
            "%{".to_string(),
            format!("static {}Director *SWIG_{}Director = NULL;", n, n),
            "%}".to_string(),
        ]);

        self.w.line("%{");
        for (hook, (_, args)) in director.hooks.iter().zip(&signatures) {
            let adapter = format!("SWIG_{}_{}", n, hook.name);
            let names: Vec<&str> = hook.args.iter().map(|a| a.name.as_str()).collect();
            self.w.lines([
                format!("{}({}) {{", d.stringify(&adapter, &hook.result, false), args),
                format!("    return SWIG_{}Director->{}({});", n, hook.name, names.join(", ")),
                "}".to_string(),
            ]);
        }
        self.w.line("%}");

        let fields: Vec<String> = director
            .fields
            .iter()
            .map(|(name, ctype)| format!("{};", d.stringify(name, ctype, false)))
            .collect();

        self.w.lines(["%inline %{".to_string(), format!("struct {}Builder {{", n)]);
        self.w.indented(|w| {
            for hook in &director.hooks {
                w.line(&format!("bool enable_{};", hook.name));
            }
            w.lines(&fields);
            w.line(&format!("{} *build({}Director *director) {{", n, n));
            w.indented(|w| {
                w.lines([
                    format!("SWIG_{}Director = director;", n),
                    format!("{} *result = ({} *)calloc(1, sizeof({}));", n, n, n),
                ]);
                for hook in &director.hooks {
                    w.lines([
                        format!("if (this->enable_{}) {{", hook.name),
                        format!("    result->{} = SWIG_{}_{};", hook.name, n, hook.name),
                        "}".to_string(),
                    ]);
                }
                for (field, _) in &director.fields {
                    w.line(&format!("result->{} = this->{};", field, field));
                }
                w.line("return result;");
            });
            w.line("}");
        });
        self.w.lines(["};", "%}"]);

        self.w
            .lines(["%pythoncode %{".to_string(), format!("def register_{}(director_class):", n)]);
        self.w.indented(|w| {
            w.line("fields = [");
            w.indented(|w| {
                w.lines(director.fields.iter().map(|(field, _)| format!("\"{}\",", field)))
            });
            w.line("]");
            w.line("funcs = [");
            w.indented(|w| w.lines(director.hooks.iter().map(|h| format!("\"{}\",", h.name))));
            w.line("]");
            w.lines([
                format!("builder = {}Builder()", n),
                "class_vars = vars(director_class).keys()".to_string(),
                "for field in fields:".to_string(),
                "    if field in class_vars:".to_string(),
                "        setattr(builder, field, getattr(director_class, field))".to_string(),
                "for func in funcs:".to_string(),
                "    if func in class_vars:".to_string(),
                "        setattr(builder, f\"enable_{func}\", True)".to_string(),
                "director = director_class()".to_string(),
                "return director, builder.build(director)".to_string(),
            ]);
        });
        self.w.line("%}");
    }

    fn enumeration(&mut self, enumeration: &Enum) {
        self.w.line("typedef enum {");
        self.w.indented(|w| {
            w.lines(
                enumeration
                    .constants
                    .iter()
                    .map(|(name, value)| format!("{} = {},", name, value)),
            )
        });
        self.w.line(&format!("}} {};", enumeration.typedef_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::class::ClassSpec;
    use crate::binding::func::{FuncOptions, GenericMarkers};
    use crate::binding::generic::GenericSpec;
    use crate::binding::typemap::{Typemap, TypemapArg};
    use crate::core::decl::{DeclKind, PrimitiveKind, RawType};
    use crate::core::header::Header;
    use crate::test_support::{typedef_ptr, Fixture};

    const SOURCE: &str = "\
typedef struct box_t { void *data; } Box;
RZ_API void *box_get(Box *b);
typedef struct rz_list_t { void *head; } RzList;
typedef struct rz_list_iter_t { void *data; } RzListIter;
typedef struct rz_core_t {
\tBox /*<int>*/ *items;
\tRzList /*<RzCoreFile *>*/ *files;
\tint blocksize;
} RzCore;
RZ_API RzCore *rz_core_new(void);
RZ_API void rz_core_free(RzCore *c);
RZ_API RZ_DEPRECATE bool rz_core_seek(RzCore *core, ut64 addr, bool rb);
RZ_API int rz_core_write_at(RzCore *core, ut64 addr, RZ_NONNULL const ut8 *buf, int size);
";

    fn ut64() -> RawType {
        RawType::typedef("ut64", RawType::builtin(PrimitiveKind::ULongLong), None)
    }

    fn typedef(fx: &Fixture, name: &str, snippet: &str, tag: &str) -> crate::core::decl::Decl {
        fx.decl(DeclKind::Typedef, name, snippet)
            .with_type(RawType::record(tag))
    }

    fn header(fx: &Fixture) -> Header {
        let core = || typedef_ptr("RzCore", "rz_core_t");
        let buf = RawType::pointer(
            RawType::typedef("ut8", RawType::builtin(PrimitiveKind::UChar), None).constant(),
        );

        fx.header(vec![
            typedef(fx, "Box", "typedef struct box_t { void *data; } Box", "box_t"),
            fx.function(
                "box_get",
                "void *box_get",
                RawType::pointer(RawType::void()),
                vec![fx.param("b", "Box *b", typedef_ptr("Box", "box_t"))],
            )
            .with_annotation("RZ_API"),
            typedef(fx, "RzList", "typedef struct rz_list_t { void *head; } RzList", "rz_list_t"),
            typedef(
                fx,
                "RzListIter",
                "typedef struct rz_list_iter_t { void *data; } RzListIter",
                "rz_list_iter_t",
            ),
            fx.decl(DeclKind::Struct, "rz_core_t", "struct rz_core_t")
                .with_child(fx.field("items", "Box /*<int>*/ *items", typedef_ptr("Box", "box_t")))
                .with_child(fx.field(
                    "files",
                    "RzList /*<RzCoreFile *>*/ *files",
                    typedef_ptr("RzList", "rz_list_t"),
                ))
                .with_child(fx.field("blocksize", "int blocksize", RawType::int())),
            typedef(fx, "RzCore", "} RzCore", "rz_core_t"),
            fx.function("rz_core_new", "RzCore *rz_core_new", core(), vec![])
                .with_annotation("RZ_API"),
            fx.function(
                "rz_core_free",
                "void rz_core_free",
                RawType::void(),
                vec![fx.param("c", "RzCore *c", core())],
            )
            .with_annotation("RZ_API"),
            fx.function(
                "rz_core_seek",
                "bool rz_core_seek",
                RawType::builtin(PrimitiveKind::Bool),
                vec![
                    fx.param("core", "RzCore *core, ut64 addr, bool", core()),
                    fx.param("addr", "ut64 addr, bool", ut64()),
                    fx.param("rb", "bool rb", RawType::builtin(PrimitiveKind::Bool)),
                ],
            )
            .with_annotation("RZ_API")
            .with_annotation("RZ_DEPRECATE"),
            fx.function(
                "rz_core_write_at",
                "int rz_core_write_at",
                RawType::int(),
                vec![
                    fx.param("core", "RzCore *core, ut64 addr, RZ_NONNULL", core()),
                    fx.param("addr", "ut64 addr, RZ_NONNULL", ut64()),
                    fx.param("buf", "const ut8 *buf", buf).with_annotation("RZ_NONNULL"),
                    fx.param("size", "int size", RawType::int()),
                ],
            )
            .with_annotation("RZ_API"),
        ])
    }

    fn bind(ctx: &mut BindingContext, header: &mut Header) {
        ctx.include("rz_core.h");
        ctx.generic(header, GenericSpec::new("Box"))
            .unwrap()
            .add_method("box_get", "get", GenericMarkers::new().returns())
            .unwrap();
        ctx.generic(header, GenericSpec::new("RzList").pointer().depends_on("RzListIter"))
            .unwrap();
        ctx.generic(header, GenericSpec::new("RzListIter").pointer())
            .unwrap();

        let mut core = ctx
            .class(header, ClassSpec::new("RzCore").rename_field("blocksize", "bsize"))
            .unwrap();
        core.add_constructor("rz_core_new").unwrap();
        core.add_destructor("rz_core_free").unwrap();
        core.add_method("rz_core_seek", "seek", FuncOptions::new().default_arg("rb", "true"))
            .unwrap();
        let buffer = Typemap::new(
            "buffer",
            vec![TypemapArg::new("const ut8 *", "buf"), TypemapArg::new("int", "size")],
        );
        core.add_method("rz_core_write_at", "write_at", FuncOptions::new().typemap(buffer))
            .unwrap();
    }

    fn rendered() -> String {
        let fx = Fixture::new(SOURCE);
        let mut header = header(&fx);
        let mut ctx = BindingContext::default();
        bind(&mut ctx, &mut header);
        ctx.validate().unwrap();
        render(&ctx).unwrap()
    }

    fn position(out: &str, needle: &str) -> usize {
        out.find(needle)
            .unwrap_or_else(|| panic!("`{}` missing from:\n{}", needle, out))
    }

    #[test]
    fn test_box_template_and_instantiation() {
        let out = rendered();

        assert_eq!(out.matches("%define %Box(TYPE)").count(), 1);
        assert_eq!(out.matches("%Box(int)").count(), 1);
        assert_eq!(out.lines().filter(|l| l.starts_with("%Box(")).count(), 1);
        assert!(position(&out, "%define %Box(TYPE)") < position(&out, "%Box(int)"));

        assert!(out.contains("        TYPE *get() {\n"));
        assert!(out.contains("            return (TYPE *)box_get($self);\n"));
        assert!(out.contains("    Box_int *items;\n"));
    }

    #[test]
    fn test_dependencies_instantiated_first() {
        let out = rendered();

        assert!(out.contains("%RzList(RzCoreFile)\n"));
        assert!(out.contains("%RzListIter(RzCoreFile)\n"));
        assert!(position(&out, "%define %RzListIter(TYPE)") < position(&out, "%define %RzList(TYPE)"));
        assert!(position(&out, "%RzListIter(RzCoreFile)") < position(&out, "%RzList(RzCoreFile)"));
        assert!(out.contains("    RzList_RzCoreFile *files;\n"));
    }

    #[test]
    fn test_header_and_prologue() {
        let out = rendered();
        assert!(out.starts_with("%module(directors=1) rizin\n%{\n#include <rz_core.h>\n%}\n"));
        assert!(out.contains("static void rizin_try_warn_deprecate(const char *name, const char *c_name) {"));
    }

    #[test]
    fn test_class_block() {
        let out = rendered();

        let expected = "\
typedef struct rz_core_t RzCore;
%rename rz_core_t RzCore;
%rename rz_core_t::blocksize bsize;
struct rz_core_t {
    Box_int *items;
    RzList_RzCoreFile *files;
    int blocksize;
};
%rename rz_core_t::blocksize \"\";
%extend rz_core_t {
    rz_core_t() {
        return rz_core_new();
    }
    ~rz_core_t() {
        return rz_core_free($self);
    }
    bool seek(ut64 addr, bool rb = true) {
        rizin_try_warn_deprecate(\"seek\", \"rz_core_seek\");
        return rz_core_seek($self, addr, rb);
    }
    %buffer_activate(const ut8 *buf, int size)
    %contract write_at(ut64 addr, ut8 const *buf, int size) {
    require:
        buf != NULL;
    }
    int write_at(ut64 addr, ut8 const *buf, int size) {
        return rz_core_write_at($self, addr, buf, size);
    }
    %buffer_deactivate(const ut8 *buf, int size)
}
";
        assert!(out.contains(expected), "class block missing from:\n{}", out);
    }

    const PLUGIN_SOURCE: &str = "\
typedef struct rz_bin_plugin_t {
\tconst char *name;
\tbool (*load_buffer)(RzBinFile *bf);
} RzBinPlugin;
typedef enum {
\tRZ_BIN_TYPE_DEFAULT = 0,
\tRZ_BIN_TYPE_CORE = 1,
} RzBinType;
";

    fn plugin_rendered() -> String {
        let fx = Fixture::new(PLUGIN_SOURCE);
        let bin_file = || typedef_ptr("RzBinFile", "rz_bin_file_t");
        let load = RawType::function(RawType::builtin(PrimitiveKind::Bool), vec![bin_file()], false);
        let enum_snippet = "typedef enum {\n\tRZ_BIN_TYPE_DEFAULT = 0,\n\tRZ_BIN_TYPE_CORE = 1,\n} RzBinType";

        let mut header = fx.header(vec![
            fx.decl(DeclKind::Struct, "rz_bin_plugin_t", "struct rz_bin_plugin_t")
                .with_child(fx.field(
                    "name",
                    "const char *name",
                    RawType::pointer(RawType::builtin(PrimitiveKind::Char).constant()),
                ))
                .with_child(
                    fx.field("load_buffer", "bool (*load_buffer", RawType::pointer(load))
                        .with_child(fx.param("bf", "RzBinFile *bf", bin_file())),
                ),
            fx.decl(DeclKind::Typedef, "RzBinPlugin", "} RzBinPlugin")
                .with_type(RawType::record("rz_bin_plugin_t")),
            fx.decl(DeclKind::Enum, "RzBinType", enum_snippet)
                .with_child(fx.decl(DeclKind::EnumConstant, "RZ_BIN_TYPE_DEFAULT", "RZ_BIN_TYPE_DEFAULT").with_value("0"))
                .with_child(fx.decl(DeclKind::EnumConstant, "RZ_BIN_TYPE_CORE", "RZ_BIN_TYPE_CORE").with_value("1")),
            fx.decl(DeclKind::Typedef, "RzBinType", "} RzBinType")
                .with_type(RawType::enumeration("RzBinType")),
        ]);

        let mut ctx = BindingContext::default();
        ctx.director(&mut header, "RzBinPlugin").unwrap();
        ctx.enumeration(&mut header, "RzBinType").unwrap();
        render(&ctx).unwrap()
    }

    #[test]
    fn test_director_blocks() {
        let out = plugin_rendered();

        let expected = r#"%feature("director") RzBinPluginDirector;
%inline %{
struct RzBinPluginDirector {
    virtual bool load_buffer(RzBinFile *bf) {
        throw Swig::DirectorPureVirtualException("load_buffer");
    }
    virtual ~RzBinPluginDirector() {}
};
%}
%{
static RzBinPluginDirector *SWIG_RzBinPluginDirector = NULL;
%}
%{
bool SWIG_RzBinPlugin_load_buffer(RzBinFile *bf) {
    return SWIG_RzBinPluginDirector->load_buffer(bf);
}
%}
%inline %{
struct RzBinPluginBuilder {
    bool enable_load_buffer;
    const char *name;
    RzBinPlugin *build(RzBinPluginDirector *director) {
        SWIG_RzBinPluginDirector = director;
        RzBinPlugin *result = (RzBinPlugin *)calloc(1, sizeof(RzBinPlugin));
        if (this->enable_load_buffer) {
            result->load_buffer = SWIG_RzBinPlugin_load_buffer;
        }
        result->name = this->name;
        return result;
    }
};
%}
%pythoncode %{
def register_RzBinPlugin(director_class):
    fields = [
        "name",
    ]
    funcs = [
        "load_buffer",
    ]
    builder = RzBinPluginBuilder()
    class_vars = vars(director_class).keys()
    for field in fields:
        if field in class_vars:
            setattr(builder, field, getattr(director_class, field))
    for func in funcs:
        if func in class_vars:
            setattr(builder, f"enable_{func}", True)
    director = director_class()
    return director, builder.build(director)
%}
"#;
        assert!(out.contains(expected), "director blocks missing from:\n{}", out);
    }

    #[test]
    fn test_director_struct_and_enum_order() {
        let out = plugin_rendered();

        // The director's struct is mirrored like any class
        let mirror = position(&out, "struct rz_bin_plugin_t {\n");
        assert!(out.contains("    bool (*load_buffer)(RzBinFile *);\n"));

        let table = "typedef enum {\n    RZ_BIN_TYPE_DEFAULT = 0,\n    RZ_BIN_TYPE_CORE = 1,\n} RzBinType;\n";
        let director = position(&out, "%feature(\"director\") RzBinPluginDirector;");
        let register = position(&out, "def register_RzBinPlugin(director_class):");
        let enumeration = position(&out, table);

        assert!(mirror < director);
        assert!(director < register);
        assert!(register < enumeration);
    }

    #[test]
    fn test_generic_python_methods() {
        let fx = Fixture::new("typedef struct rz_list_t { void *head; } RzList;");
        let mut header = fx.header(vec![fx
            .decl(DeclKind::Typedef, "RzList", "typedef struct rz_list_t { void *head; } RzList")
            .with_type(RawType::record("rz_list_t"))]);

        let mut ctx = BindingContext::default();
        ctx.generic(&mut header, GenericSpec::new("RzList").pointer())
            .unwrap()
            .add_python_method("__iter__(self)", &["it = self.iterator()", "return it"])
            .unwrap();
        let out = render(&ctx).unwrap();

        let expected = "    %extend RzList_##TYPE {
        %pythoncode %{
            def __iter__(self):
                it = self.iterator()
                return it
        %}
    }
%enddef
";
        assert!(out.contains(expected), "python method missing from:\n{}", out);
    }

    #[test]
    fn test_without_directors() {
        let ctx = BindingContext::new(crate::binding::context::BindOptions {
            module: "demo".to_string(),
            directors: false,
            ..Default::default()
        });
        let out = render(&ctx).unwrap();
        assert!(out.starts_with("%module demo\n"));
        assert!(out.contains("bool demo_warn_deprecate = true;"));
    }
}

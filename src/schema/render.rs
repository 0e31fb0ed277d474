//! Schema Rendering
//!
//! Writes a [`ProtoFile`] back out as IDL text. Element types are emitted as
//! originally written so the output re-parses and re-links the same way.

use std::fmt::Write;

use super::types::{
    EnumType, Extend, Field, MessageType, OptionElement, OptionValue, ProtoFile, Service, Type,
};

const INDENT: &str = "  ";

impl ProtoFile {
    /// Render this file as `.proto` source
    pub fn to_schema(&self) -> String {
        let mut out = String::new();
        out.push_str("// Code generated by wire-schema. Do not edit.\n");
        let _ = writeln!(out, "// Source: {}", self.location);
        out.push('\n');

        if let Some(syntax) = &self.syntax {
            let _ = writeln!(out, "syntax = \"{}\";", syntax);
        }
        if let Some(package) = &self.package_name {
            let _ = writeln!(out, "package {};", package);
        }
        if !self.imports.is_empty() || !self.public_imports.is_empty() {
            out.push('\n');
            for import in &self.imports {
                let _ = writeln!(out, "import \"{}\";", escape(import));
            }
            for import in &self.public_imports {
                let _ = writeln!(out, "import public \"{}\";", escape(import));
            }
        }
        if !self.options.is_empty() {
            out.push('\n');
            for option in &self.options {
                let _ = writeln!(out, "option {};", render_option(option));
            }
        }
        for ty in &self.types {
            out.push('\n');
            render_type(&mut out, ty, 0);
        }
        for extend in &self.extend_list {
            out.push('\n');
            render_extend(&mut out, extend, 0);
        }
        for service in &self.services {
            out.push('\n');
            render_service(&mut out, service);
        }
        out
    }
}

fn render_type(out: &mut String, ty: &Type, depth: usize) {
    match ty {
        Type::Message(message) => render_message(out, message, depth),
        Type::Enum(enum_type) => render_enum(out, enum_type, depth),
    }
}

fn render_message(out: &mut String, message: &MessageType, depth: usize) {
    let indent = INDENT.repeat(depth);
    render_documentation(out, &message.documentation, &indent);
    let _ = writeln!(out, "{}message {} {{", indent, message.ty.simple_name());
    let inner = INDENT.repeat(depth + 1);
    for option in &message.options {
        let _ = writeln!(out, "{}option {};", inner, render_option(option));
    }
    for reserved in &message.reserved {
        let _ = writeln!(out, "{}reserved {};", inner, reserved);
    }
    for extensions in &message.extensions {
        let _ = writeln!(out, "{}extensions {};", inner, extensions);
    }
    for field in &message.fields {
        render_field(out, field, &inner, true);
    }
    for one_of in &message.one_ofs {
        render_documentation(out, &one_of.documentation, &inner);
        let _ = writeln!(out, "{}oneof {} {{", inner, one_of.name);
        let member = INDENT.repeat(depth + 2);
        for field in &one_of.fields {
            render_field(out, field, &member, false);
        }
        let _ = writeln!(out, "{}}}", inner);
    }
    for nested in &message.nested_types {
        render_type(out, nested, depth + 1);
    }
    for extend in &message.nested_extends {
        render_extend(out, extend, depth + 1);
    }
    let _ = writeln!(out, "{}}}", indent);
}

fn render_enum(out: &mut String, enum_type: &EnumType, depth: usize) {
    let indent = INDENT.repeat(depth);
    render_documentation(out, &enum_type.documentation, &indent);
    let _ = writeln!(out, "{}enum {} {{", indent, enum_type.ty.simple_name());
    let inner = INDENT.repeat(depth + 1);
    for option in &enum_type.options {
        let _ = writeln!(out, "{}option {};", inner, render_option(option));
    }
    for reserved in &enum_type.reserved {
        let _ = writeln!(out, "{}reserved {};", inner, reserved);
    }
    for constant in &enum_type.constants {
        render_documentation(out, &constant.documentation, &inner);
        let _ = writeln!(
            out,
            "{}{} = {}{};",
            inner,
            constant.name,
            constant.tag,
            render_field_options(&constant.options)
        );
    }
    let _ = writeln!(out, "{}}}", indent);
}

fn render_field(out: &mut String, field: &Field, indent: &str, with_label: bool) {
    render_documentation(out, &field.documentation, indent);
    let label = match (with_label, field.label) {
        (true, Some(label)) => format!("{} ", label.as_str()),
        _ => String::new(),
    };
    let _ = writeln!(
        out,
        "{}{}{} {} = {}{};",
        indent,
        label,
        field.element_type,
        field.name,
        field.tag,
        render_field_options(&field.options)
    );
}

fn render_extend(out: &mut String, extend: &Extend, depth: usize) {
    let indent = INDENT.repeat(depth);
    render_documentation(out, &extend.documentation, &indent);
    let _ = writeln!(out, "{}extend {} {{", indent, extend.element_type);
    let inner = INDENT.repeat(depth + 1);
    for field in &extend.fields {
        render_field(out, field, &inner, true);
    }
    let _ = writeln!(out, "{}}}", indent);
}

fn render_service(out: &mut String, service: &Service) {
    render_documentation(out, &service.documentation, "");
    let _ = writeln!(out, "service {} {{", service.ty.simple_name());
    for option in &service.options {
        let _ = writeln!(out, "{}option {};", INDENT, render_option(option));
    }
    for rpc in &service.rpcs {
        render_documentation(out, &rpc.documentation, INDENT);
        let request_stream = if rpc.request_streaming { "stream " } else { "" };
        let response_stream = if rpc.response_streaming { "stream " } else { "" };
        let _ = write!(
            out,
            "{}rpc {}({}{}) returns ({}{})",
            INDENT, rpc.name, request_stream, rpc.request_element, response_stream, rpc.response_element
        );
        if rpc.options.is_empty() {
            out.push_str(";\n");
        } else {
            out.push_str(" {\n");
            for option in &rpc.options {
                let _ = writeln!(out, "{}{}option {};", INDENT, INDENT, render_option(option));
            }
            let _ = writeln!(out, "{}}}", INDENT);
        }
    }
    out.push_str("}\n");
}

fn render_documentation(out: &mut String, documentation: &str, indent: &str) {
    for line in documentation.lines() {
        if line.is_empty() {
            let _ = writeln!(out, "{}//", indent);
        } else {
            let _ = writeln!(out, "{}// {}", indent, line);
        }
    }
}

fn render_field_options(options: &[OptionElement]) -> String {
    if options.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = options.iter().map(render_option).collect();
    format!(" [{}]", rendered.join(", "))
}

fn render_option(option: &OptionElement) -> String {
    match &option.value {
        OptionValue::String(value) => format!("{} = \"{}\"", option.name, escape(value)),
        OptionValue::Raw(value) => format!("{} = {}", option.name, value),
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

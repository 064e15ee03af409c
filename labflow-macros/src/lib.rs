use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Lit, PathArguments,
    Type,
};

#[proc_macro_derive(WorkflowDefinition, attributes(workflow, field))]
pub fn derive_workflow_definition(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    // Extract workflow metadata from #[workflow(...)]
    let workflow_meta = extract_workflow_meta(&input.attrs, &input.ident.to_string());

    // Extract field schemas from struct fields, in declaration order
    let field_schemas: Vec<proc_macro2::TokenStream> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .filter_map(|f| {
                    let name = f.ident.as_ref()?.to_string();
                    let meta = extract_field_meta(&f.attrs);

                    if meta.skip {
                        return None;
                    }

                    let cli_arg = format!("--{}", name.replace('_', "-"));
                    let required = !is_option_type(&f.ty);
                    let default = option_tokens(
                        meta.default.as_ref().map(|d| quote! { #d.to_string() }),
                    );
                    let label = meta.label.clone().unwrap_or_else(|| name.replace('_', " "));
                    let description = meta.description.clone();
                    let field_type = meta
                        .field_type_tokens(&f.ty)
                        .unwrap_or_else(|| infer_field_type(&f.ty));

                    Some(quote! {
                        labflow_sdk::FieldSchema {
                            name: #name.to_string(),
                            field_type: #field_type,
                            label: #label.to_string(),
                            description: #description.to_string(),
                            cli_arg: #cli_arg.to_string(),
                            required: #required,
                            default: #default,
                        }
                    })
                })
                .collect(),
            _ => panic!("WorkflowDefinition only supports named fields"),
        },
        _ => panic!("WorkflowDefinition only supports structs"),
    };

    let struct_name = &input.ident;
    let workflow_id = &workflow_meta.id;
    let workflow_name = &workflow_meta.name;
    let workflow_desc = &workflow_meta.description;

    let expanded = quote! {
        impl labflow_sdk::WorkflowDefinition for #struct_name {
            fn metadata() -> labflow_sdk::WorkflowMetadata {
                labflow_sdk::WorkflowMetadata {
                    id: #workflow_id.to_string(),
                    name: #workflow_name.to_string(),
                    description: #workflow_desc.to_string(),
                }
            }

            fn fields() -> Vec<labflow_sdk::FieldSchema> {
                vec![#(#field_schemas),*]
            }
        }
    };

    TokenStream::from(expanded)
}

struct WorkflowMeta {
    id: String,
    name: String,
    description: String,
}

/// Groups used inside `type = "repeated"` need no #[workflow], so the
/// attribute falls back to the struct name.
fn extract_workflow_meta(attrs: &[Attribute], struct_name: &str) -> WorkflowMeta {
    let mut meta = WorkflowMeta {
        id: struct_name.to_string(),
        name: struct_name.to_string(),
        description: String::new(),
    };

    for attr in attrs {
        if attr.path().is_ident("workflow") {
            let _ = attr.parse_nested_meta(|nested| {
                let value = nested.value()?;
                let lit: Lit = value.parse()?;
                if let Lit::Str(s) = lit {
                    if nested.path.is_ident("id") {
                        meta.id = s.value();
                    } else if nested.path.is_ident("name") {
                        meta.name = s.value();
                    } else if nested.path.is_ident("description") {
                        meta.description = s.value();
                    }
                }
                Ok(())
            });
        }
    }

    meta
}

#[derive(Default)]
struct FieldMeta {
    label: Option<String>,
    description: String,
    field_type: Option<String>,
    min: Option<i64>,
    max: Option<i64>,
    max_digits: Option<usize>,
    len_matches: Option<String>,
    options: Option<String>,
    catalog: Option<String>,
    distinct_from: Option<String>,
    group: Option<String>,
    default: Option<String>,
    skip: bool,
}

impl FieldMeta {
    /// Build the field type from an explicit `type = "..."`
    fn field_type_tokens(&self, ty: &Type) -> Option<proc_macro2::TokenStream> {
        let field_type = self.field_type.as_deref()?;

        let tokens = match field_type {
            "text" => quote! { labflow_sdk::FieldType::Text },
            "number" => {
                let min = option_tokens(self.min.map(|m| quote! { #m }));
                let max = option_tokens(self.max.map(|m| quote! { #m }));
                quote! { labflow_sdk::FieldType::Number { min: #min, max: #max } }
            }
            "float" => quote! { labflow_sdk::FieldType::Float },
            "bool" => quote! { labflow_sdk::FieldType::Bool },
            "identifiers" => {
                let max_digits = option_tokens(self.max_digits.map(|d| quote! { #d }));
                quote! { labflow_sdk::FieldType::Identifiers { max_digits: #max_digits } }
            }
            "float_list" => {
                let len_matches =
                    option_tokens(self.len_matches.as_ref().map(|l| quote! { #l.to_string() }));
                quote! { labflow_sdk::FieldType::FloatList { len_matches: #len_matches } }
            }
            "select" => {
                let options = self.options_tokens();
                let distinct_from = option_tokens(
                    self.distinct_from.as_ref().map(|d| quote! { #d.to_string() }),
                );
                quote! {
                    labflow_sdk::FieldType::Select {
                        options: #options,
                        distinct_from: #distinct_from,
                    }
                }
            }
            "multi_select" => {
                let options = self.options_tokens();
                quote! { labflow_sdk::FieldType::MultiSelect { options: #options } }
            }
            "input_file" => quote! { labflow_sdk::FieldType::InputPath { directory: false } },
            "input_dir" => quote! { labflow_sdk::FieldType::InputPath { directory: true } },
            "output_dir" => quote! { labflow_sdk::FieldType::OutputDir },
            "repeated" => {
                let group: syn::Path = match &self.group {
                    Some(group) => syn::parse_str(group).expect("group must be a type path"),
                    None => vec_inner_path(ty)
                        .expect("repeated fields need Vec<Group> or group = \"...\""),
                };
                quote! {
                    labflow_sdk::FieldType::Repeated {
                        fields: <#group as labflow_sdk::WorkflowDefinition>::fields(),
                    }
                }
            }
            other => panic!("unknown field type \"{}\"", other),
        };

        Some(tokens)
    }

    fn options_tokens(&self) -> proc_macro2::TokenStream {
        if let Some(catalog) = &self.catalog {
            let path: syn::Path = syn::parse_str(catalog).expect("catalog must be a path");
            return quote! { #path.iter().map(|s| s.to_string()).collect() };
        }

        let options: Vec<String> = self
            .options
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        quote! { vec![#(#options.to_string()),*] }
    }
}

fn option_tokens(value: Option<proc_macro2::TokenStream>) -> proc_macro2::TokenStream {
    value
        .map(|v| quote! { Some(#v) })
        .unwrap_or(quote! { None })
}

fn extract_field_meta(attrs: &[Attribute]) -> FieldMeta {
    let mut meta = FieldMeta::default();

    for attr in attrs {
        if attr.path().is_ident("field") {
            let _ = attr.parse_nested_meta(|nested| {
                if nested.path.is_ident("skip") {
                    meta.skip = true;
                    return Ok(());
                }

                let value = nested.value()?;
                let lit: Lit = value.parse()?;
                let s = match lit {
                    Lit::Str(s) => s.value(),
                    _ => return Ok(()),
                };

                if nested.path.is_ident("label") {
                    meta.label = Some(s);
                } else if nested.path.is_ident("description") {
                    meta.description = s;
                } else if nested.path.is_ident("type") {
                    meta.field_type = Some(s);
                } else if nested.path.is_ident("min") {
                    meta.min = s.parse::<i64>().ok();
                } else if nested.path.is_ident("max") {
                    meta.max = s.parse::<i64>().ok();
                } else if nested.path.is_ident("max_digits") {
                    meta.max_digits = s.parse::<usize>().ok();
                } else if nested.path.is_ident("len_matches") {
                    meta.len_matches = Some(s);
                } else if nested.path.is_ident("options") {
                    meta.options = Some(s);
                } else if nested.path.is_ident("catalog") {
                    meta.catalog = Some(s);
                } else if nested.path.is_ident("distinct_from") {
                    meta.distinct_from = Some(s);
                } else if nested.path.is_ident("group") {
                    meta.group = Some(s);
                } else if nested.path.is_ident("default") {
                    meta.default = Some(s);
                }
                Ok(())
            });
        }
    }

    meta
}

fn infer_field_type(ty: &Type) -> proc_macro2::TokenStream {
    // Look through Option<T>
    if let Some(inner) = generic_inner(ty, "Option") {
        return infer_field_type_inner(inner);
    }
    infer_field_type_inner(ty)
}

fn infer_field_type_inner(ty: &Type) -> proc_macro2::TokenStream {
    if let Some(inner) = generic_inner(ty, "Vec") {
        return match last_ident(inner).as_deref() {
            Some("f64") | Some("f32") => {
                quote! { labflow_sdk::FieldType::FloatList { len_matches: None } }
            }
            _ => quote! { labflow_sdk::FieldType::Identifiers { max_digits: None } },
        };
    }

    match last_ident(ty).as_deref() {
        Some("PathBuf") => quote! { labflow_sdk::FieldType::InputPath { directory: false } },
        Some("usize") | Some("u32") | Some("u64") | Some("i32") | Some("i64") => {
            quote! { labflow_sdk::FieldType::Number { min: None, max: None } }
        }
        Some("f64") | Some("f32") => quote! { labflow_sdk::FieldType::Float },
        Some("bool") => quote! { labflow_sdk::FieldType::Bool },
        _ => quote! { labflow_sdk::FieldType::Text },
    }
}

fn last_ident(ty: &Type) -> Option<String> {
    if let Type::Path(type_path) = ty {
        return type_path.path.segments.last().map(|s| s.ident.to_string());
    }
    None
}

fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == wrapper {
            if let PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(GenericArgument::Type(inner_ty)) = args.args.first() {
                    return Some(inner_ty);
                }
            }
        }
    }
    None
}

fn vec_inner_path(ty: &Type) -> Option<syn::Path> {
    match generic_inner(ty, "Vec")? {
        Type::Path(type_path) => Some(type_path.path.clone()),
        _ => None,
    }
}

fn is_option_type(ty: &Type) -> bool {
    generic_inner(ty, "Option").is_some()
}

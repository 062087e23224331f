use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Block, Data, DeriveInput, ImplItem, ImplItemFn, ItemImpl,
    Stmt, Variant, Visibility,
};

/// Procedural macro that enhances error enums with generic error handling
///
/// This macro automatically:
/// 1. Adds `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Adds a `Generic { message: String }` variant if not already present
/// 3. Implements `From<anyhow::Error>` for the error type
/// 4. Provides helper methods for error conversion
///
/// # Usage
///
/// ```rust,ignore
/// #[auth_error]
/// pub enum MyError {
///     #[error("Specific error: {code}")]
///     SpecificError { code: u32 },
///     #[error("Another error: {message}")]
///     AnotherError { message: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn auth_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "auth_error can only be applied to enums")
            .to_compile_error()
            .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;

    // Existing derive/uniffi attributes are replaced by the ones generated below
    let attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi"))
        .collect();

    let has_generic = data_enum
        .variants
        .iter()
        .any(|variant| variant.ident == "Generic");

    let mut variants = data_enum.variants.clone();
    if !has_generic {
        let generic_variant: Variant = syn::parse_quote! {
            /// A generic error that can wrap any anyhow error.
            #[error("Generic error: {message}")]
            Generic {
                /// The error message from the wrapped error.
                message: String
            }
        };
        variants.push(generic_variant);
    }

    let expanded = quote! {
        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                Self::Generic {
                    message: {
                        // Include the full error chain in the message
                        let mut message = err.to_string();
                        let chain: Vec<String> = err.chain().skip(1).map(|e| e.to_string()).collect();
                        if !chain.is_empty() {
                            message.push_str(" (caused by: ");
                            message.push_str(&chain.join(" -> "));
                            message.push(')');
                        }
                        message
                    }
                }
            }
        }

        impl #generics #enum_name #generics {
            /// Convert an anyhow::Result to a Result with this error type
            pub fn from_anyhow_result<T>(result: anyhow::Result<T>) -> Result<T, Self> {
                result.map_err(Self::from)
            }
        }
    };

    TokenStream::from(expanded)
}

/// Procedural macro that wraps `uniffi::export` and automatically injects logging context
///
/// This macro automatically:
/// 1. Forwards the attribute to `#[uniffi::export]`
/// 2. Injects a `crate::primitives::logger::LogContext` named after the impl's type at the
///    start of every `pub fn`
/// 3. Runs the body of every `pub async fn` inside a task-local logging scope so the
///    context survives `.await` points
/// 4. Automatically adds `async_runtime = "tokio"` if any async functions are detected
///
/// # Usage
///
/// ```rust,ignore
/// #[migrator_export]
/// impl MyStruct {
///     pub fn some_method(&self) -> String {
///         debug!("This will be prefixed with [AuthMigrator][MyStruct]");
///         "result".to_string()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn migrator_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_impl = parse_macro_input!(input as ItemImpl);

    let type_name = match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    };

    let has_async_functions = has_async_functions_in_impl(&input_impl.items);

    let new_items = input_impl
        .items
        .iter()
        .map(|item| match item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                let mut new_method = method.clone();
                inject_logging_context(&mut new_method, &type_name);
                ImplItem::Fn(new_method)
            }
            _ => item.clone(),
        })
        .collect();

    let new_impl = ItemImpl {
        items: new_items,
        ..input_impl
    };

    let mut args = proc_macro2::TokenStream::from(args);
    if has_async_functions {
        if args.is_empty() {
            args = quote! { async_runtime = "tokio" };
        } else {
            args = quote! { #args, async_runtime = "tokio" };
        }
    }

    quote! {
        #[uniffi::export(#args)]
        #new_impl
    }
    .into()
}

/// Check if any public functions in the impl items are async
fn has_async_functions_in_impl(impl_items: &[ImplItem]) -> bool {
    impl_items.iter().any(|item| {
        if let ImplItem::Fn(method) = item {
            matches!(method.vis, Visibility::Public(_)) && method.sig.asyncness.is_some()
        } else {
            false
        }
    })
}

/// Inject logging context at the start of a function body
fn inject_logging_context(method: &mut ImplItemFn, type_name: &str) {
    let context_stmt: Stmt = syn::parse_quote! {
        let _authmigrator_logger_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };

    if method.sig.asyncness.is_some() {
        let stmts = &method.block.stmts;
        let scoped: Block = syn::parse_quote! {{
            crate::primitives::logger::LOG_CONTEXT
                .scope(::std::cell::RefCell::new(None), async move {
                    #context_stmt
                    #(#stmts)*
                })
                .await
        }};
        method.block = scoped;
    } else {
        method.block.stmts.insert(0, context_stmt);
    }
}

//! Lightweight lexical scan of GLSL source for declared names.
//!
//! This is not a parser. It tokenizes on non-identifier characters, skips
//! comments and numeric literals, and keeps identifiers that follow a type
//! name, a storage qualifier, `struct`, `#define`, or a struct name declared
//! earlier in the same text. Comma-separated declarator lists
//! (`float a, b;`) are followed at the parenthesis depth of the first
//! declarator.

use std::collections::HashSet;
use std::iter::Peekable;
use std::str::CharIndices;

/// Built-in type names. Any of these followed by an identifier declares it.
pub const TYPE_NAMES: &[&str] = &[
    "void", "bool", "int", "uint", "float", "double",
    "vec2", "vec3", "vec4", "bvec2", "bvec3", "bvec4",
    "ivec2", "ivec3", "ivec4", "uvec2", "uvec3", "uvec4",
    "dvec2", "dvec3", "dvec4",
    "mat2", "mat3", "mat4", "mat2x2", "mat2x3", "mat2x4",
    "mat3x2", "mat3x3", "mat3x4", "mat4x2", "mat4x3", "mat4x4",
    "dmat2", "dmat3", "dmat4",
    "sampler1D", "sampler2D", "sampler3D", "samplerCube",
    "sampler1DShadow", "sampler2DShadow", "samplerCubeShadow",
    "sampler1DArray", "sampler2DArray", "sampler2DArrayShadow",
    "sampler2DMS", "sampler2DRect", "samplerBuffer",
    "isampler2D", "isampler3D", "usampler2D", "usampler3D",
    "image1D", "image2D", "image3D", "imageCube", "image2DArray",
    "iimage2D", "uimage2D", "atomic_uint",
];

/// Storage, interpolation, precision and parameter qualifiers.
pub const QUALIFIERS: &[&str] = &[
    "const", "uniform", "in", "out", "inout", "attribute", "varying",
    "buffer", "shared", "centroid", "sample", "patch", "flat", "smooth",
    "noperspective", "highp", "mediump", "lowp", "precise", "invariant",
    "coherent", "volatile", "restrict", "readonly", "writeonly",
];

/// Reserved words that never name a user declaration.
pub const RESERVED_WORDS: &[&str] = &[
    "struct", "layout", "precision", "subroutine",
    "if", "else", "for", "while", "do", "switch", "case", "default",
    "break", "continue", "return", "discard", "true", "false",
];

pub const BUILTIN_VARIABLES: &[&str] = &[
    "gl_Position", "gl_PointSize", "gl_ClipDistance", "gl_VertexID",
    "gl_InstanceID", "gl_FragCoord", "gl_FrontFacing", "gl_PointCoord",
    "gl_FragColor", "gl_FragData", "gl_FragDepth", "gl_PrimitiveID",
    "gl_Layer", "gl_ViewportIndex", "gl_SampleID", "gl_SamplePosition",
    "gl_NumWorkGroups", "gl_WorkGroupID", "gl_WorkGroupSize",
    "gl_LocalInvocationID", "gl_GlobalInvocationID", "gl_LocalInvocationIndex",
];

pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan",
    "pow", "exp", "log", "exp2", "log2", "sqrt", "inversesqrt",
    "abs", "sign", "floor", "ceil", "trunc", "round", "fract", "mod",
    "min", "max", "clamp", "mix", "step", "smoothstep", "isnan", "isinf",
    "length", "distance", "dot", "cross", "normalize", "faceforward",
    "reflect", "refract", "matrixCompMult", "outerProduct", "transpose",
    "determinant", "inverse", "lessThan", "greaterThan", "equal", "notEqual",
    "any", "all", "not", "texture", "textureLod", "textureOffset",
    "texelFetch", "textureSize", "textureGrad", "textureProj",
    "dFdx", "dFdy", "fwidth", "imageLoad", "imageStore",
    "barrier", "memoryBarrier", "atomicAdd", "emitVertex", "endPrimitive",
];

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn contains(table: &[&str], word: &str) -> bool {
    table.iter().any(|&entry| entry == word)
}

fn is_type_or_qualifier(word: &str) -> bool {
    contains(TYPE_NAMES, word) || contains(QUALIFIERS, word)
}

/// True for words the language reserves; these are never user declarations.
pub fn is_reserved(word: &str) -> bool {
    is_type_or_qualifier(word) || contains(RESERVED_WORDS, word)
}

/// Every keyword and built-in name, in table order, without duplicates.
pub fn keyword_seeds() -> impl Iterator<Item = &'static str> {
    let mut seen = HashSet::new();
    TYPE_NAMES
        .iter()
        .chain(QUALIFIERS)
        .chain(RESERVED_WORDS)
        .chain(BUILTIN_VARIABLES)
        .chain(BUILTIN_FUNCTIONS)
        .copied()
        .filter(move |word| seen.insert(*word))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident { word: &'a str, after_hash: bool },
    Number,
    /// A word containing non-ASCII letters; never a GLSL identifier.
    Foreign,
    Punct(char),
}

/// Names declared in `text`, deduplicated, in order of first appearance.
pub fn extract_declarations(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut struct_names: HashSet<&str> = HashSet::new();

    let mut prev: Option<Token<'_>> = None;
    let mut depth: i32 = 0;
    // Paren depth of the active declarator list, if any.
    let mut decl_depth: Option<i32> = None;

    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        if c == '/' {
            match chars.peek().map(|&(_, n)| n) {
                Some('/') => {
                    while let Some(&(_, n)) = chars.peek() {
                        if n == '\n' {
                            break;
                        }
                        chars.next();
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut last = '\0';
                    for (_, n) in chars.by_ref() {
                        if last == '*' && n == '/' {
                            break;
                        }
                        last = n;
                    }
                    continue;
                }
                _ => {}
            }
        }

        if is_foreign_letter(c) {
            skip_word(&mut chars);
            prev = Some(Token::Foreign);
            continue;
        }

        if is_identifier_start(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(idx, n)) = chars.peek() {
                if !is_identifier_char(n) {
                    break;
                }
                end = idx + n.len_utf8();
                chars.next();
            }
            if chars.peek().is_some_and(|&(_, n)| is_foreign_letter(n)) {
                skip_word(&mut chars);
                prev = Some(Token::Foreign);
                continue;
            }
            let word = &text[start..end];

            let declares = match prev {
                Some(Token::Ident { word: p, after_hash }) => {
                    (after_hash && p == "define")
                        || p == "struct"
                        || is_type_or_qualifier(p)
                        || struct_names.contains(p)
                }
                Some(Token::Punct(',')) => decl_depth == Some(depth),
                _ => false,
            };

            if declares && !is_reserved(word) {
                if matches!(prev, Some(Token::Ident { word: "struct", .. })) {
                    struct_names.insert(word);
                }
                if seen.insert(word) {
                    names.push(word.to_string());
                }
                decl_depth = Some(depth);
            }

            let after_hash = matches!(prev, Some(Token::Punct('#')));
            prev = Some(Token::Ident { word, after_hash });
            continue;
        }

        if c.is_ascii_digit() {
            while let Some(&(_, n)) = chars.peek() {
                if !(n.is_ascii_alphanumeric() || n == '.' || n == '_') {
                    break;
                }
                chars.next();
            }
            prev = Some(Token::Number);
            continue;
        }

        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if decl_depth.is_some_and(|d| depth < d) {
                    decl_depth = None;
                }
            }
            ';' | '{' | '}' => decl_depth = None,
            _ => {}
        }
        prev = Some(Token::Punct(c));
    }

    names
}

fn is_foreign_letter(c: char) -> bool {
    !c.is_ascii() && c.is_alphanumeric()
}

fn skip_word(chars: &mut Peekable<CharIndices<'_>>) {
    while chars
        .peek()
        .is_some_and(|&(_, n)| is_identifier_char(n) || is_foreign_letter(n))
    {
        chars.next();
    }
}

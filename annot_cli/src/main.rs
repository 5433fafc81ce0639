use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use annot_attrs::{annotation_attributes, Annotation, AnnotationAttribute, ElementValue};
use annot_core::format::{ACC_ABSTRACT, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
use annot_core::{Attribute, ClassFile, ClassReader, ClassWriter, Member, RawAttribute};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "annot",
    about = "Inspect and generate the annotation attributes of Java class files",
    version
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every annotation on a class, its fields, and its methods
    Dump {
        /// Class file to read
        file: PathBuf,
        /// Emit JSON instead of JSR-175 source text
        #[arg(long)]
        json: bool,
    },
    /// Hex dump the raw bodies of annotation attributes
    Hex {
        /// Class file to read
        file: PathBuf,
        /// Only show attributes of the field or method with this name
        #[arg(short, long)]
        member: Option<String>,
    },
    /// Write a small class file that carries every annotation attribute kind
    Sample {
        /// Destination class file
        output: PathBuf,
    },
}

// ── Reports ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MemberReport {
    name: String,
    descriptor: String,
    annotations: Vec<AnnotationAttribute>,
}

#[derive(Serialize)]
struct ClassReport {
    class: String,
    super_class: Option<String>,
    annotations: Vec<AnnotationAttribute>,
    fields: Vec<MemberReport>,
    methods: Vec<MemberReport>,
}

impl ClassReport {
    fn build(cr: &ClassReader, class: &ClassFile) -> anyhow::Result<Self> {
        let members = |list: &[Member]| -> anyhow::Result<Vec<MemberReport>> {
            list.iter()
                .map(|m| -> anyhow::Result<MemberReport> {
                    Ok(MemberReport {
                        name: m.name.clone(),
                        descriptor: m.descriptor.clone(),
                        annotations: annotation_attributes(cr, &m.attributes)
                            .with_context(|| format!("decoding annotations of {}", m.name))?,
                    })
                })
                .collect()
        };
        Ok(Self {
            class: class.this_class.clone(),
            super_class: class.super_class.clone(),
            annotations: annotation_attributes(cr, &class.attributes)
                .context("decoding class annotations")?,
            fields: members(&class.fields)?,
            methods: members(&class.methods)?,
        })
    }

    /// Source-like text: one block per annotated owner.
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "class {}", self.class);
        write_attributes(&mut out, &self.annotations);
        for (kind, members) in [("field", &self.fields), ("method", &self.methods)] {
            for m in members.iter().filter(|m| !m.annotations.is_empty()) {
                let _ = writeln!(out, "{} {} {}", kind, m.name, m.descriptor);
                write_attributes(&mut out, &m.annotations);
            }
        }
        out
    }
}

fn write_attributes(out: &mut String, attrs: &[AnnotationAttribute]) {
    for attr in attrs {
        let text = attr.to_string();
        if text.starts_with('\n') {
            let _ = writeln!(out, "  {}:{}", attr.name(), text.replace('\n', "\n    "));
        } else {
            let _ = writeln!(out, "  {}: {}", attr.name(), text);
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}

fn open_class(path: &Path) -> anyhow::Result<(ClassReader, ClassFile)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading class file {:?}", path))?;
    let cr = ClassReader::new(bytes).with_context(|| format!("parsing {:?}", path))?;
    let class = ClassFile::parse(&cr).with_context(|| format!("walking {:?}", path))?;
    Ok((cr, class))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "  {:04x}  ", i * 16);
        for b in chunk {
            let _ = write!(out, "{:02x} ", b);
        }
        for _ in chunk.len()..16 {
            out.push_str("   ");
        }
        out.push_str("  |");
        for b in chunk {
            if b.is_ascii_graphic() || *b == b' ' {
                out.push(*b as char);
            } else {
                out.push('.');
            }
        }
        out.push_str("|\n");
    }
    out
}

/// The annotated class written by `annot sample`.
fn sample_class() -> anyhow::Result<Vec<u8>> {
    let retention = Annotation::new("Ljava/lang/annotation/Retention;").with(
        "value",
        ElementValue::Enum {
            type_name: "Ljava/lang/annotation/RetentionPolicy;".into(),
            const_name: "RUNTIME".into(),
        },
    );
    let class_attrs = AnnotationAttribute::RuntimeVisibleAnnotations(vec![
        Annotation::new("Ljava/lang/Deprecated;"),
        retention,
        Annotation::new("Lcom/example/Author;")
            .with("name", ElementValue::String("Ada".into()))
            .with("year", ElementValue::Int(1843)),
    ]);
    let field_attrs = AnnotationAttribute::RuntimeInvisibleAnnotations(vec![Annotation::new(
        "Lcom/example/Limits;",
    )
    .with("value", ElementValue::Array(vec![ElementValue::Long(0), ElementValue::Long(1 << 32)]))
    .with("ratio", ElementValue::Double(0.75))]);
    let param_attrs = AnnotationAttribute::RuntimeVisibleParameterAnnotations(vec![
        vec![Annotation::new("Lcom/example/NonNull;")],
        vec![],
        vec![Annotation::new("Lcom/example/Range;")
            .with("min", ElementValue::Short(1))
            .with("max", ElementValue::Short(10))],
    ]);
    let default_attr = AnnotationAttribute::AnnotationDefault(ElementValue::Class(
        "Ljava/lang/Object;".into(),
    ));

    let mut cw = ClassWriter::new(
        ACC_PUBLIC | ACC_SUPER,
        "com/example/Sample",
        Some("java/lang/Object"),
    )?;
    cw.add_field(ACC_PUBLIC | ACC_STATIC, "LIMIT", "J", &[&field_attrs])?;
    cw.add_method(
        ACC_PUBLIC,
        "configure",
        "(Ljava/lang/String;ZS)V",
        &[&param_attrs],
    )?;
    cw.add_method(
        ACC_PUBLIC | ACC_ABSTRACT,
        "type",
        "()Ljava/lang/Class;",
        &[&default_attr],
    )?;
    cw.add_attribute(&class_attrs)?;
    cw.finish()
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_dump(file: PathBuf, json: bool) -> anyhow::Result<()> {
    let (cr, class) = open_class(&file)?;
    let report = ClassReport::build(&cr, &class)?;
    info!(class = %report.class, "decoded annotations");
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

fn run_hex(file: PathBuf, member: Option<String>) -> anyhow::Result<()> {
    let (cr, class) = open_class(&file)?;

    let mut owners: Vec<(String, &[RawAttribute])> = Vec::new();
    if member.is_none() {
        owners.push((format!("class {}", class.this_class), class.attributes.as_slice()));
    }
    for (kind, list) in [("field", &class.fields), ("method", &class.methods)] {
        for m in list {
            if member.as_deref().map_or(true, |name| name == m.name) {
                owners.push((format!("{} {}{}", kind, m.name, m.descriptor), m.attributes.as_slice()));
            }
        }
    }

    let mut shown = 0;
    for (owner, attrs) in owners {
        for raw in attrs.iter().filter(|a| AnnotationAttribute::handles(&a.name)) {
            let body = &cr.bytes()[raw.offset..raw.end()];
            println!(
                "--- {} {} (offset {}, {} bytes) ---",
                owner, raw.name, raw.offset, raw.length
            );
            print!("{}", hex_dump(body));
            shown += 1;
        }
    }
    debug!(attributes = shown, "hex dump complete");
    if shown == 0 {
        eprintln!("no annotation attributes found");
    }
    Ok(())
}

fn run_sample(output: PathBuf) -> anyhow::Result<()> {
    let bytes = sample_class()?;
    std::fs::write(&output, &bytes)
        .with_context(|| format!("writing class file {:?}", output))?;
    eprintln!("  class       : com/example/Sample");
    eprintln!("  size        : {}", human_bytes(bytes.len() as u64));
    eprintln!("  written to  : {:?}", output);
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    match cli.command {
        Commands::Dump { file, json } => run_dump(file, json),
        Commands::Hex { file, member } => run_hex(file, member),
        Commands::Sample { output } => run_sample(output),
    }
}
